//! Parent-document ("small-to-big") retrieval (§4.2 `parent_document`):
//! retrieve over small child chunks for precision, return the larger parent
//! chunk for context.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Query, Retriever, RetrieverParams};
use crate::chunk::{sort_and_truncate, Chunk, RetrievalResult};
use crate::error::Result;
use crate::ports::ChunkRepository;

/// Wraps an inner retriever that runs over child chunks; results are
/// deduplicated by `parent_id` (keeping the best child score) and resolved
/// back to the parent chunk via the repository.
pub struct ParentDocumentRetriever<R: Retriever> {
    child: R,
    repository: Arc<dyn ChunkRepository>,
}

impl<R: Retriever> ParentDocumentRetriever<R> {
    pub fn new(child: R, repository: Arc<dyn ChunkRepository>) -> Self {
        Self { child, repository }
    }
}

#[async_trait]
impl<R: Retriever> Retriever for ParentDocumentRetriever<R> {
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
        let child_results = self.child.retrieve(query, corpus, &fetch_params).await?;

        let mut best_per_parent: HashMap<Uuid, (Uuid, f32)> = HashMap::new();
        let mut no_parent: Vec<RetrievalResult> = Vec::new();

        for result in child_results {
            match result.chunk.parent_id {
                Some(parent_id) => {
                    let entry = best_per_parent
                        .entry(parent_id)
                        .or_insert((result.chunk.id, result.score));
                    if result.score > entry.1 {
                        *entry = (result.chunk.id, result.score);
                    }
                }
                None => no_parent.push(result),
            }
        }

        let parent_ids: Vec<Uuid> = best_per_parent.keys().copied().collect();
        let parents = self.repository.get_chunks_by_ids(&parent_ids).await?;
        let parents_by_id: HashMap<Uuid, Chunk> =
            parents.into_iter().map(|c| (c.id, c)).collect();

        let mut results: Vec<RetrievalResult> = best_per_parent
            .into_iter()
            .filter_map(|(parent_id, (_, score))| {
                parents_by_id
                    .get(&parent_id)
                    .map(|chunk| RetrievalResult::new(chunk.clone(), score))
            })
            .collect();
        results.extend(no_parent);

        Ok(sort_and_truncate(results, params.top_k))
    }
}
