//! Maximal Marginal Relevance retrieval (§4.2 `mmr`): diversity-aware
//! selection over a dense candidate pool.

use async_trait::async_trait;

use super::{cosine_similarity, filter_corpus, Query, Retriever, RetrieverParams};
use crate::chunk::{Chunk, RetrievalResult};
use crate::error::{PipelineError, Result};

pub struct MmrRetriever;

#[async_trait]
impl Retriever for MmrRetriever {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>> {
        let query_embedding = query.embedding.as_ref().ok_or_else(|| {
            PipelineError::MissingInput("mmr retriever requires a query embedding".into())
        })?;

        let mut candidates: Vec<(Chunk, f32)> = filter_corpus(corpus, params)
            .into_iter()
            .filter_map(|c| {
                c.embedding
                    .as_ref()
                    .map(|e| (c.clone(), cosine_similarity(query_embedding, e)))
            })
            .collect();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(params.fetch_k.max(params.top_k));

        let mut selected: Vec<(Chunk, f32)> = Vec::new();
        let mut remaining = candidates;

        while selected.len() < params.top_k && !remaining.is_empty() {
            let mut best_idx = 0usize;
            let mut best_score = f32::NEG_INFINITY;

            for (i, (chunk, relevance)) in remaining.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|(s, _)| {
                        let e = s.embedding.as_ref().unwrap();
                        cosine_similarity(chunk.embedding.as_ref().unwrap(), e)
                    })
                    .fold(0.0f32, f32::max);

                let mmr_score = params.lambda * relevance - (1.0 - params.lambda) * redundancy;
                if mmr_score > best_score {
                    best_score = mmr_score;
                    best_idx = i;
                }
            }

            let (chunk, relevance) = remaining.remove(best_idx);
            selected.push((chunk, relevance));
        }

        Ok(selected
            .into_iter()
            .map(|(chunk, relevance)| RetrievalResult::new(chunk, relevance))
            .collect())
    }
}
