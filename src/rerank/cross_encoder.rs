//! Cross-encoder reranking (§4.3 `cross_encoder`): a pluggable scorer that
//! sees the (query, candidate) pair jointly, instead of comparing two
//! independently computed embeddings.

use std::sync::Arc;

use async_trait::async_trait;

use super::RerankStrategy;
use crate::chunk::{sort_and_truncate, RetrievalResult};
use crate::error::Result;
use crate::ports::Reranker;

pub struct CrossEncoderReranker {
    scorer: Arc<dyn Reranker>,
}

impl CrossEncoderReranker {
    pub fn new(scorer: Arc<dyn Reranker>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl RerankStrategy for CrossEncoderReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalResult>,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let scores = self.scorer.rerank(query, &candidates).await?;
        let rescored: Vec<RetrievalResult> = candidates
            .into_iter()
            .zip(scores)
            .map(|(mut r, score)| {
                r.score = score;
                r
            })
            .collect();
        Ok(sort_and_truncate(rescored, top_k))
    }
}
