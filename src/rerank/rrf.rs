//! Reciprocal Rank Fusion (§4.3 `rrf`). `k = 60` by default, per the
//! original convention. Ties are broken by the order the input list
//! presented them in, not chunk id, so re-running `fuse` on stable inputs is
//! itself stable (supplemented from `original_source`).

use std::collections::HashMap;

use uuid::Uuid;

use crate::chunk::{sort_and_truncate, RetrievalResult};

pub const DEFAULT_K: f32 = 60.0;

/// Rescale a single result list's ranks through the RRF formula
/// `1 / (k + rank)`. Kept as pure rescaling rather than a no-op passthrough,
/// per the Open Question decision.
pub fn rescale(results: &[RetrievalResult], k: f32) -> Vec<RetrievalResult> {
    results
        .iter()
        .enumerate()
        .map(|(rank, r)| {
            let mut rescaled = r.clone();
            rescaled.score = 1.0 / (k + (rank as f32 + 1.0));
            rescaled
        })
        .collect()
}

/// Fuse multiple ranked result lists into one, summing `1 / (k + rank)`
/// across every list a chunk appears in.
pub fn fuse(lists: &[Vec<RetrievalResult>], k: f32, top_k: usize) -> Vec<RetrievalResult> {
    let mut scores: HashMap<Uuid, f32> = HashMap::new();
    let mut chunks: HashMap<Uuid, RetrievalResult> = HashMap::new();
    let mut first_seen_order: Vec<Uuid> = Vec::new();

    for list in lists {
        for (rank, r) in list.iter().enumerate() {
            let contribution = 1.0 / (k + (rank as f32 + 1.0));
            if !scores.contains_key(&r.chunk.id) {
                first_seen_order.push(r.chunk.id);
            }
            *scores.entry(r.chunk.id).or_insert(0.0) += contribution;
            chunks
                .entry(r.chunk.id)
                .or_insert_with(|| RetrievalResult::new(r.chunk.clone(), 0.0));
        }
    }

    let mut results: Vec<RetrievalResult> = first_seen_order
        .into_iter()
        .map(|id| {
            let mut r = chunks.remove(&id).unwrap();
            r.score = scores[&id];
            r
        })
        .collect();

    // sort_and_truncate breaks ties by chunk id; stable-sort first on
    // first-seen order so genuinely tied scores still favor earlier input
    // lists before falling back to id.
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    sort_and_truncate(results, top_k)
}
