//! Query augmentation operations (§4.4, `augmentor` stage): `multi_query`,
//! `hyde` and `expansion`. Results are cached per `(op, query, num_variants)`
//! so a retried or fanned-out pipeline doesn't re-pay the LLM call, and the
//! stage degrades to the original query when no LLM is configured or the
//! call fails with a degrading error (§5: augmentor is one of only two
//! kinds that degrade rather than fail).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::ports::Llm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentOp {
    MultiQuery,
    Hyde,
    Expansion,
}

pub struct Augmentor {
    llm: Option<Arc<dyn Llm>>,
    cache: Mutex<HashMap<String, Vec<String>>>,
}

impl Augmentor {
    pub fn new(llm: Option<Arc<dyn Llm>>) -> Self {
        Self {
            llm,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Expand `query` under `op`. Never returns an empty vec: a missing LLM
    /// or a degrading failure falls back to `[query]` unchanged.
    pub async fn augment(&self, op: AugmentOp, query: &str, num_variants: usize) -> Result<Vec<String>> {
        let cache_key = format!("{op:?}:{num_variants}:{query}");
        if let Some(cached) = self.cache.lock().await.get(&cache_key) {
            return Ok(cached.clone());
        }

        let llm = match &self.llm {
            Some(llm) => llm,
            None => {
                warn!(?op, "augmentor: no LLM configured, degrading to original query");
                return Ok(vec![query.to_string()]);
            }
        };

        let result = match op {
            AugmentOp::MultiQuery => multi_query(llm.as_ref(), query, num_variants).await,
            AugmentOp::Hyde => hyde(llm.as_ref(), query).await,
            AugmentOp::Expansion => expansion(llm.as_ref(), query).await,
        };

        let variants = match result {
            Ok(v) => v,
            Err(err) if err.degrades() => {
                warn!(?op, error = %err, "augmentor: LLM call failed, degrading to original query");
                vec![query.to_string()]
            }
            Err(err) => return Err(err),
        };

        self.cache.lock().await.insert(cache_key, variants.clone());
        Ok(variants)
    }
}

async fn multi_query(llm: &dyn Llm, query: &str, num_variants: usize) -> Result<Vec<String>> {
    let prompt = format!(
        "Generate {num_variants} alternative phrasings of this search query. \
         Respond with a JSON array of strings if possible, otherwise one per line:\n{query}"
    );
    let response = llm.complete(&prompt).await?;

    let mut variants: Vec<String> = serde_json::from_str::<Vec<String>>(response.trim())
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    if variants.is_empty() {
        variants = response
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
    }

    variants.truncate(num_variants);

    // The original query must always be retrievable through one of the
    // variants, regardless of what the LLM returned.
    if !variants.iter().any(|v| v == query) {
        variants.push(query.to_string());
    }

    Ok(variants)
}

async fn hyde(llm: &dyn Llm, query: &str) -> Result<Vec<String>> {
    let prompt = format!(
        "Write a short hypothetical passage that would answer this question:\n{query}"
    );
    let hypothetical = llm.complete(&prompt).await?;
    Ok(vec![hypothetical])
}

async fn expansion(llm: &dyn Llm, query: &str) -> Result<Vec<String>> {
    let prompt = format!(
        "List a few closely related terms or synonyms for this search query, space separated:\n{query}"
    );
    let related = llm.complete(&prompt).await?;
    Ok(vec![format!("{query} {}", related.trim())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use async_trait::async_trait;

    struct FakeLlm(String);

    #[async_trait]
    impl Llm for FakeLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl Llm for FailingLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(PipelineError::External("timed out".into()))
        }
    }

    #[tokio::test]
    async fn no_llm_degrades_to_original_query() {
        let augmentor = Augmentor::new(None);
        let variants = augmentor.augment(AugmentOp::Hyde, "what is rust?", 3).await.unwrap();
        assert_eq!(variants, vec!["what is rust?".to_string()]);
    }

    #[tokio::test]
    async fn failing_llm_degrades_instead_of_failing() {
        let augmentor = Augmentor::new(Some(Arc::new(FailingLlm)));
        let variants = augmentor
            .augment(AugmentOp::MultiQuery, "rust programming", 2)
            .await
            .unwrap();
        assert_eq!(variants, vec!["rust programming".to_string()]);
    }

    #[tokio::test]
    async fn multi_query_splits_llm_response_into_lines() {
        let llm = Arc::new(FakeLlm("rust language\nsystems programming".to_string()));
        let augmentor = Augmentor::new(Some(llm));
        let variants = augmentor.augment(AugmentOp::MultiQuery, "rust", 2).await.unwrap();
        assert_eq!(variants.len(), 3);
        assert!(variants.contains(&"rust language".to_string()));
        assert!(variants.contains(&"systems programming".to_string()));
    }

    #[tokio::test]
    async fn multi_query_parses_json_array_responses() {
        let llm = Arc::new(FakeLlm(r#"["rust basics", "systems language"]"#.to_string()));
        let augmentor = Augmentor::new(Some(llm));
        let variants = augmentor.augment(AugmentOp::MultiQuery, "rust", 2).await.unwrap();
        assert!(variants.contains(&"rust basics".to_string()));
        assert!(variants.contains(&"systems language".to_string()));
    }

    #[tokio::test]
    async fn multi_query_always_includes_the_original_query() {
        let llm = Arc::new(FakeLlm("rust language\nsystems programming".to_string()));
        let augmentor = Augmentor::new(Some(llm));
        let variants = augmentor.augment(AugmentOp::MultiQuery, "rust", 2).await.unwrap();
        assert!(variants.contains(&"rust".to_string()));
    }

    #[tokio::test]
    async fn repeated_calls_are_served_from_cache() {
        let llm = Arc::new(FakeLlm("hypothetical answer".to_string()));
        let augmentor = Augmentor::new(Some(llm));
        let first = augmentor.augment(AugmentOp::Hyde, "rust", 1).await.unwrap();
        let second = augmentor.augment(AugmentOp::Hyde, "rust", 1).await.unwrap();
        assert_eq!(first, second);
    }
}
