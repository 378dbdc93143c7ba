//! Retrieval algorithm library (§4.2): dense, keyword, hybrid, MMR,
//! parent-document and query-augmenting wrapper retrievers, all behind one
//! [`Retriever`] trait so the registry handler for `retriever` nodes can be
//! generic over the chosen strategy.

mod dense;
mod hybrid;
mod keyword;
mod mmr;
mod parent_document;
mod wrappers;

pub use dense::DenseRetriever;
pub use hybrid::HybridRetriever;
pub use keyword::KeywordRetriever;
pub use mmr::MmrRetriever;
pub use parent_document::ParentDocumentRetriever;
pub use wrappers::{ExpansionRetriever, HydeRetriever, MultiQueryRetriever};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunk::{Chunk, RetrievalResult};
use crate::error::Result;

/// A retrieval query: raw text plus, when the strategy needs it, a
/// precomputed embedding.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Tunables shared across retrieval strategies. Each strategy reads only the
/// fields it needs (§4.2 Non-goals: no per-strategy config structs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverParams {
    pub top_k: usize,
    /// Restrict candidates to these `document_id`s, threaded through every
    /// retriever (supplemented from `original_source`, not just dense/keyword
    /// as the distilled spec implied).
    #[serde(default)]
    pub document_filter: Option<Vec<String>>,
    /// Hybrid fusion weight toward the dense list; 0.0 is pure keyword, 1.0
    /// is pure dense.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// MMR relevance/diversity trade-off; 1.0 is pure relevance.
    #[serde(default = "default_lambda")]
    pub lambda: f32,
    /// Candidate pool size fetched before MMR/parent-document dedup narrows
    /// it down to `top_k`.
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
}

fn default_alpha() -> f32 {
    0.5
}

fn default_lambda() -> f32 {
    0.5
}

fn default_fetch_k() -> usize {
    50
}

impl Default for RetrieverParams {
    fn default() -> Self {
        Self {
            top_k: 10,
            document_filter: None,
            alpha: default_alpha(),
            lambda: default_lambda(),
            fetch_k: default_fetch_k(),
        }
    }
}

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &Query,
        corpus: &[Chunk],
        params: &RetrieverParams,
    ) -> Result<Vec<RetrievalResult>>;
}

/// Apply `document_filter`, returning references into `corpus` (§4.2 edge
/// case: an empty filter list yields an empty candidate set, not "no
/// filter").
pub(crate) fn filter_corpus<'a>(corpus: &'a [Chunk], params: &RetrieverParams) -> Vec<&'a Chunk> {
    match &params.document_filter {
        None => corpus.iter().collect(),
        Some(allowed) => corpus
            .iter()
            .filter(|c| allowed.iter().any(|d| d == &c.document_id))
            .collect(),
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Min-max normalize scores to `[0, 1]`. A list with zero spread normalizes
/// to all-`1.0` rather than dividing by zero (§4.2 hybrid edge case).
pub(crate) fn min_max_normalize(results: &mut [RetrievalResult]) {
    if results.is_empty() {
        return;
    }
    let min = results.iter().map(|r| r.score).fold(f32::INFINITY, f32::min);
    let max = results
        .iter()
        .map(|r| r.score)
        .fold(f32::NEG_INFINITY, f32::max);
    let spread = max - min;
    for r in results.iter_mut() {
        r.score = if spread.abs() < f32::EPSILON {
            1.0
        } else {
            (r.score - min) / spread
        };
    }
}
