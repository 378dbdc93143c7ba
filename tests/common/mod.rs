//! Fakes shared across integration scenarios: no network, no disk, fully
//! deterministic so timing- and ordering-sensitive assertions hold.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ragforge::chunk::{Chunk, RetrievalResult};
use ragforge::error::{PipelineError, Result};
use ragforge::ports::{ChunkRepository, Clock, Embedder, EmbedderInfo, Llm, Reranker};

/// Embeds text into a 2D vector by a silly but deterministic rule: the
/// fraction of vowels in the text becomes the x-coordinate, the complement
/// the y-coordinate. Different topics land at different angles without any
/// external model.
pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vowel_vector(t)).collect())
    }

    fn info(&self) -> EmbedderInfo {
        EmbedderInfo {
            model: "fake-embedder".into(),
            dimensions: 2,
            cost_per_1m_tokens: Some(0.0),
        }
    }
}

pub fn vowel_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let total = lower.chars().filter(|c| c.is_alphabetic()).count().max(1) as f32;
    let vowels = lower.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
    let x = vowels / total;
    let y = 1.0 - x;
    vec![x, y]
}

/// Echoes the prompt back with a fixed prefix; lets tests assert a
/// completion ran without needing a real model.
pub struct EchoLlm;

#[async_trait]
impl Llm for EchoLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(format!("answer: {prompt}"))
    }
}

/// An LLM fake that always returns a degrading error, for augmentor/remote
/// reranker fallback scenarios.
pub struct FailingLlm;

#[async_trait]
impl Llm for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(PipelineError::External("llm backend unreachable".into()))
    }
}

/// Scores candidates by their position in the input, reversed, so a
/// reranker pass is observably different from its input order.
pub struct ReverseReranker;

#[async_trait]
impl Reranker for ReverseReranker {
    async fn rerank(&self, _query: &str, candidates: &[RetrievalResult]) -> Result<Vec<f32>> {
        Ok((0..candidates.len()).rev().map(|i| i as f32).collect())
    }
}

/// A reranker that always fails with a degrading error, for
/// `RemoteReranker` passthrough scenarios.
pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _query: &str, _candidates: &[RetrievalResult]) -> Result<Vec<f32>> {
        Err(PipelineError::External("reranker backend unreachable".into()))
    }
}

/// In-memory chunk repository keyed by document id, good enough to stand in
/// for a vector database in tests.
#[derive(Default)]
pub struct InMemoryChunkRepository {
    chunks: std::sync::Mutex<Vec<Chunk>>,
}

impl InMemoryChunkRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkRepository for InMemoryChunkRepository {
    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn put_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        self.chunks.lock().unwrap().extend(chunks);
        Ok(())
    }

    async fn get_chunk(&self, id: uuid::Uuid) -> Result<Option<Chunk>> {
        Ok(self.chunks.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn get_chunks_by_ids(&self, ids: &[uuid::Uuid]) -> Result<Vec<Chunk>> {
        Ok(self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

/// A clock that always reports the same instant, for deterministic
/// `ExecutionState.updated_at` assertions.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Counts how many times each named checkpoint has fired, for ordering
/// assertions in the diamond-parallelism scenario.
#[derive(Default)]
pub struct CallOrder {
    counter: AtomicUsize,
    order: std::sync::Mutex<Vec<(String, usize)>>,
}

impl CallOrder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, label: &str) -> usize {
        let tick = self.counter.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push((label.to_string(), tick));
        tick
    }

    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.order
            .lock()
            .unwrap()
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, tick)| *tick)
    }
}
