//! Query-augmenting wrapper retrievers (§4.2): each rewrites or expands the
//! query via an LLM/embedder before delegating to an inner retriever.
//! `MultiQuery` additionally fuses the per-variant result lists with RRF.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Query, Retriever, RetrieverParams};
use crate::chunk::{Chunk, RetrievalResult};
use crate::error::Result;
use crate::ports::{Embedder, Llm};
use crate::rerank::rrf;

/// Generates `num_queries` paraphrases of the input query, retrieves with
/// each independently, and fuses the lists with RRF (§4.2 `multi_query`).
pub struct MultiQueryRetriever<R: Retriever> {
    inner: R,
    llm: Arc<dyn Llm>,
    embedder: Arc<dyn Embedder>,
    num_queries: usize,
}

impl<R: Retriever> MultiQueryRetriever<R> {
    pub fn new(inner: R, llm: Arc<dyn Llm>, embedder: Arc<dyn Embedder>, num_queries: usize) -> Self {
        Self {
            inner,
            llm,
            embedder,
            num_queries: num_queries.max(1),
        }
    }

    async fn generate_variants(&self, query: &Query) -> Result<Vec<String>> {
        let prompt = format!(
            "Generate {} alternative phrasings of this search query. Respond with a JSON \
             array of strings if possible, otherwise one per line:\n{}",
            self.num_queries, query.text
        );
        let response = self.llm.complete(&prompt).await?;

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

        variants.truncate(self.num_queries);

        if !variants.iter().any(|v| v == &query.text) {
            variants.push(query.text.clone());
        }

        Ok(variants)
    }
}

#[async_trait]
impl<R: Retriever> Retriever for MultiQueryRetriever<R> {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>> {
        let variants = self.generate_variants(query).await?;
        let embeddings = self.embedder.embed(&variants).await?;

        let mut lists = Vec::with_capacity(variants.len());
        for (text, embedding) in variants.into_iter().zip(embeddings) {
            let variant_query = Query::new(text).with_embedding(embedding);
            lists.push(self.inner.retrieve(&variant_query, corpus, params).await?);
        }

        Ok(rrf::fuse(&lists, rrf::DEFAULT_K, params.top_k))
    }
}

/// Hypothetical Document Embeddings: asks the LLM to write a hypothetical
/// answer, embeds *that*, and retrieves with the resulting embedding in
/// place of the raw query's (§4.2 `hyde`).
pub struct HydeRetriever<R: Retriever> {
    inner: R,
    llm: Arc<dyn Llm>,
    embedder: Arc<dyn Embedder>,
}

impl<R: Retriever> HydeRetriever<R> {
    pub fn new(inner: R, llm: Arc<dyn Llm>, embedder: Arc<dyn Embedder>) -> Self {
        Self { inner, llm, embedder }
    }
}

#[async_trait]
impl<R: Retriever> Retriever for HydeRetriever<R> {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>> {
        let prompt = format!(
            "Write a short hypothetical passage that would answer this question:\n{}",
            query.text
        );
        let hypothetical = self.llm.complete(&prompt).await?;
        let embeddings = self.embedder.embed(&[hypothetical.clone()]).await?;
        let embedding = embeddings.into_iter().next().unwrap_or_default();

        let hyde_query = Query::new(hypothetical).with_embedding(embedding);
        self.inner.retrieve(&hyde_query, corpus, params).await
    }
}

/// Expands the query with LLM-suggested related terms before re-embedding
/// and delegating (§4.2 `expansion`).
pub struct ExpansionRetriever<R: Retriever> {
    inner: R,
    llm: Arc<dyn Llm>,
    embedder: Arc<dyn Embedder>,
}

impl<R: Retriever> ExpansionRetriever<R> {
    pub fn new(inner: R, llm: Arc<dyn Llm>, embedder: Arc<dyn Embedder>) -> Self {
        Self { inner, llm, embedder }
    }
}

#[async_trait]
impl<R: Retriever> Retriever for ExpansionRetriever<R> {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>> {
        let prompt = format!(
            "List a few closely related terms or synonyms for this search query, space separated:\n{}",
            query.text
        );
        let expansion = self.llm.complete(&prompt).await?;
        let expanded_text = format!("{} {}", query.text, expansion.trim());

        let embeddings = self.embedder.embed(&[expanded_text.clone()]).await?;
        let embedding = embeddings.into_iter().next().unwrap_or_default();

        let expanded_query = Query::new(expanded_text).with_embedding(embedding);
        self.inner.retrieve(&expanded_query, corpus, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::EmbedderInfo;
    use crate::retrieval::DenseRetriever;

    struct FakeLlm {
        response: String,
    }

    #[async_trait]
    impl Llm for FakeLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn info(&self) -> EmbedderInfo {
            EmbedderInfo {
                model: "fake".into(),
                dimensions: 2,
                cost_per_1m_tokens: None,
            }
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![Chunk::new("d", "rust systems programming", 0, 0, 1).with_embedding(vec![1.0, 0.0])]
    }

    #[tokio::test]
    async fn multi_query_fuses_variant_results() {
        let llm = Arc::new(FakeLlm {
            response: "rust programming\nsystems language".to_string(),
        });
        let retriever = MultiQueryRetriever::new(DenseRetriever, llm, Arc::new(FakeEmbedder), 2);
        let query = Query::new("rust");
        let params = RetrieverParams::default();
        let results = retriever.retrieve(&query, &corpus(), &params).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn hyde_embeds_hypothetical_answer() {
        let llm = Arc::new(FakeLlm {
            response: "Rust is a systems programming language.".to_string(),
        });
        let retriever = HydeRetriever::new(DenseRetriever, llm, Arc::new(FakeEmbedder));
        let query = Query::new("what is rust?");
        let params = RetrieverParams::default();
        let results = retriever.retrieve(&query, &corpus(), &params).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn expansion_appends_related_terms() {
        let llm = Arc::new(FakeLlm {
            response: "language memory-safety".to_string(),
        });
        let retriever = ExpansionRetriever::new(DenseRetriever, llm, Arc::new(FakeEmbedder));
        let query = Query::new("rust");
        let params = RetrieverParams::default();
        let results = retriever.retrieve(&query, &corpus(), &params).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
