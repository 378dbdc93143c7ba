//! Remote reranking service (§4.3 `remote`): same contract as
//! [`super::cross_encoder::CrossEncoderReranker`], but transport failures
//! degrade to the original candidate order instead of failing the pipeline
//! node (§5 error taxonomy: only reranker/augmentor degrade).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::RerankStrategy;
use crate::chunk::{sort_and_truncate, RetrievalResult};
use crate::error::Result;
use crate::ports::Reranker;

pub struct RemoteReranker {
    scorer: Arc<dyn Reranker>,
}

impl RemoteReranker {
    pub fn new(scorer: Arc<dyn Reranker>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl RerankStrategy for RemoteReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalResult>,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        match self.scorer.rerank(query, &candidates).await {
            Ok(scores) => {
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
            Err(err) if err.degrades() => {
                warn!(error = %err, "remote reranker unavailable, degrading to input order");
                Ok(candidates.into_iter().take(top_k).collect())
            }
            Err(err) => Err(err),
        }
    }
}
