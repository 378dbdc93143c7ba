//! Dense (embedding cosine-similarity) retrieval (§4.2 `dense`).

use async_trait::async_trait;

use super::{cosine_similarity, filter_corpus, Query, Retriever, RetrieverParams};
use crate::chunk::{sort_and_truncate, Chunk, RetrievalResult};
use crate::error::{PipelineError, Result};

pub struct DenseRetriever;

#[async_trait]
impl Retriever for DenseRetriever {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>> {
        let query_embedding = query.embedding.as_ref().ok_or_else(|| {
            PipelineError::MissingInput("dense retriever requires a query embedding".into())
        })?;

        let candidates = filter_corpus(corpus, params);
        let results: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter_map(|chunk| {
                chunk.embedding.as_ref().map(|embedding| {
                    let score = cosine_similarity(query_embedding, embedding);
                    RetrievalResult::new(chunk.clone(), score)
                })
            })
            .collect();

        Ok(sort_and_truncate(results, params.top_k))
    }
}
