//! Chunk and retrieval-result data model (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A contiguous slice of a document's text with its character offsets and
/// optional embedding. Chunks are owned by the repository; handlers receive
/// immutable references (§3 Ownership).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: String,
    pub text: String,
    /// Dense from 0, unique per `document_id`
    pub index: usize,
    pub start_char: usize,
    pub end_char: usize,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub fts_token: Option<String>,
}

impl Chunk {
    pub fn new(document_id: impl Into<String>, text: impl Into<String>, index: usize, start_char: usize, end_char: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            text: text.into(),
            index,
            start_char,
            end_char,
            metadata: HashMap::new(),
            embedding: None,
            parent_id: None,
            fts_token: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// A candidate chunk produced directly by a chunking strategy, prior to
/// being assigned a stable id / document context by the caller (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkCandidate {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChunkCandidate {
    pub fn new(text: impl Into<String>, start_char: usize, end_char: usize) -> Self {
        Self {
            text: text.into(),
            start_char,
            end_char,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Turn chunking candidates into owned, dense-indexed `Chunk`s for a document.
pub fn candidates_into_chunks(document_id: &str, candidates: Vec<ChunkCandidate>) -> Vec<Chunk> {
    candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| Chunk {
            id: Uuid::new_v4(),
            document_id: document_id.to_string(),
            text: candidate.text,
            index,
            start_char: candidate.start_char,
            end_char: candidate.end_char,
            metadata: candidate.metadata,
            embedding: None,
            parent_id: None,
            fts_token: None,
        })
        .collect()
}

/// One scored hit from a retriever. Results are always delivered ordered by
/// descending score; scores are comparable only within one result set
/// (§3 RetrievalResult).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RetrievalResult {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        Self {
            chunk,
            score,
            metadata: HashMap::new(),
        }
    }
}

/// Sort results by descending score, breaking ties by ascending `Chunk.id`
/// for determinism (§4.2 Edge cases), then truncate to `top_k`.
pub fn sort_and_truncate(mut results: Vec<RetrievalResult>, top_k: usize) -> Vec<RetrievalResult> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_get_dense_zero_based_index() {
        let candidates = vec![
            ChunkCandidate::new("a", 0, 1),
            ChunkCandidate::new("b", 1, 2),
        ];
        let chunks = candidates_into_chunks("doc1", candidates);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
        assert!(chunks.iter().all(|c| c.document_id == "doc1"));
    }

    #[test]
    fn sort_and_truncate_breaks_ties_by_id() {
        let mut low = Chunk::new("d", "x", 0, 0, 1);
        let mut high = Chunk::new("d", "y", 1, 1, 2);
        low.id = Uuid::from_u128(1);
        high.id = Uuid::from_u128(2);

        let results = vec![
            RetrievalResult::new(high.clone(), 1.0),
            RetrievalResult::new(low.clone(), 1.0),
        ];
        let sorted = sort_and_truncate(results, 2);
        assert_eq!(sorted[0].chunk.id, low.id);
        assert_eq!(sorted[1].chunk.id, high.id);
    }

    #[test]
    fn sort_and_truncate_respects_top_k() {
        let results = vec![
            RetrievalResult::new(Chunk::new("d", "a", 0, 0, 1), 0.5),
            RetrievalResult::new(Chunk::new("d", "b", 1, 1, 2), 0.9),
            RetrievalResult::new(Chunk::new("d", "c", 2, 2, 3), 0.1),
        ];
        let sorted = sort_and_truncate(results, 2);
        assert_eq!(sorted.len(), 2);
        assert!(sorted[0].score >= sorted[1].score);
    }
}
