//! Alpha-weighted dense/keyword fusion retrieval (§4.2 `hybrid`).
//!
//! Each input list is min-max normalized independently before fusion, per
//! the Open Question decision to keep per-list normalization rather than
//! add a global-normalization knob.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::{min_max_normalize, DenseRetriever, KeywordRetriever, Query, Retriever, RetrieverParams};
use crate::chunk::{sort_and_truncate, Chunk, RetrievalResult};
use crate::error::Result;

pub struct HybridRetriever;

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>> {
        let fetch_params = RetrieverParams {
            top_k: params.fetch_k,
            ..params.clone()
        };

        let mut dense = DenseRetriever.retrieve(query, corpus, &fetch_params).await?;
        let mut keyword = KeywordRetriever.retrieve(query, corpus, &fetch_params).await?;
        min_max_normalize(&mut dense);
        min_max_normalize(&mut keyword);

        let mut combined: HashMap<Uuid, RetrievalResult> = HashMap::new();
        for r in dense {
            let entry = combined
                .entry(r.chunk.id)
                .or_insert_with(|| RetrievalResult::new(r.chunk.clone(), 0.0));
            entry.score += params.alpha * r.score;
        }
        for r in keyword {
            let entry = combined
                .entry(r.chunk.id)
                .or_insert_with(|| RetrievalResult::new(r.chunk.clone(), 0.0));
            entry.score += (1.0 - params.alpha) * r.score;
        }

        let results: Vec<RetrievalResult> = combined.into_values().collect();
        Ok(sort_and_truncate(results, params.top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with_embedding(doc: &str, idx: usize, text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::new(doc, text, idx, 0, 1).with_embedding(embedding)
    }

    #[tokio::test]
    async fn fuses_dense_and_keyword_scores() {
        let corpus = vec![
            chunk_with_embedding("d", 0, "rust programming language", vec![1.0, 0.0]),
            chunk_with_embedding("d", 1, "unrelated cooking text", vec![0.0, 1.0]),
        ];
        let query = Query::new("rust programming").with_embedding(vec![1.0, 0.0]);
        let params = RetrieverParams {
            alpha: 0.5,
            ..Default::default()
        };
        let results = HybridRetriever.retrieve(&query, &corpus, &params).await.unwrap();
        assert_eq!(results[0].chunk.index, 0);
    }

    #[tokio::test]
    async fn alpha_zero_behaves_like_pure_keyword() {
        let corpus = vec![
            chunk_with_embedding("d", 0, "totally unrelated to query text", vec![1.0, 0.0]),
            chunk_with_embedding("d", 1, "rust programming", vec![0.0, 1.0]),
        ];
        let query = Query::new("rust programming").with_embedding(vec![1.0, 0.0]);
        let params = RetrieverParams {
            alpha: 0.0,
            ..Default::default()
        };
        let results = HybridRetriever.retrieve(&query, &corpus, &params).await.unwrap();
        assert_eq!(results[0].chunk.index, 1);
    }
}
