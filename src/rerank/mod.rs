//! Reranking algorithm library (§4.3): pluggable cross-encoder scoring, a
//! remote reranking service with degrade-on-failure, and Reciprocal Rank
//! Fusion.

mod cross_encoder;
mod remote;
pub mod rrf;

pub use cross_encoder::CrossEncoderReranker;
pub use remote::RemoteReranker;

use async_trait::async_trait;

use crate::chunk::RetrievalResult;
use crate::error::Result;

#[async_trait]
pub trait RerankStrategy: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalResult>,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>>;
}
