//! Capability registry (§6, Redesign Flags): a closed [`Handler`] trait per
//! [`Kind`], resolved through a static map instead of the original's
//! dynamic dispatch by string type name. Unknown kinds are rejected at
//! graph-admission time, before the engine starts scheduling waves.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::augment::{AugmentOp, Augmentor};
use crate::chunk::{candidates_into_chunks, Chunk, RetrievalResult};
use crate::chunking::{self, ChunkParams, SentenceEmbedder, Strategy};
use crate::error::{PipelineError, Result};
use crate::graph::{Graph, Kind, NodeConfig};
use crate::ports::{ChunkRepository, Embedder, Llm};
use crate::rerank::RerankStrategy;
use crate::retrieval::{Query, Retriever, RetrieverParams};

/// One document handed to the `loader` stage and consumed by `splitter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub id: String,
    pub text: String,
}

/// Engine-opaque handler payload: a typed accessor layer over JSON rather
/// than a fully generic typed-port system, per the Open Question decision
/// to keep handler outputs interchangeable across stage boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerOutput(pub serde_json::Value);

impl HandlerOutput {
    pub fn from_documents(docs: Vec<LoadedDocument>) -> Self {
        Self(serde_json::json!({ "documents": docs }))
    }

    pub fn documents(&self) -> Result<Vec<LoadedDocument>> {
        let value = self.0.get("documents").cloned().unwrap_or(self.0.clone());
        serde_json::from_value(value).map_err(PipelineError::from)
    }

    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self(serde_json::json!({ "chunks": chunks }))
    }

    pub fn chunks(&self) -> Result<Vec<Chunk>> {
        let value = self.0.get("chunks").cloned().unwrap_or(self.0.clone());
        serde_json::from_value(value).map_err(PipelineError::from)
    }

    pub fn from_results(results: Vec<RetrievalResult>) -> Self {
        Self(serde_json::json!({ "results": results }))
    }

    pub fn results(&self) -> Result<Vec<RetrievalResult>> {
        let value = self.0.get("results").cloned().unwrap_or(self.0.clone());
        serde_json::from_value(value).map_err(PipelineError::from)
    }

    pub fn from_texts(texts: Vec<String>) -> Self {
        Self(serde_json::json!({ "texts": texts }))
    }

    pub fn texts(&self) -> Result<Vec<String>> {
        let value = self.0.get("texts").cloned().unwrap_or(self.0.clone());
        serde_json::from_value(value).map_err(PipelineError::from)
    }

    pub fn from_llm_response(response: LlmResponse) -> Self {
        Self(serde_json::json!(response))
    }

    pub fn llm_response(&self) -> Result<LlmResponse> {
        serde_json::from_value(self.0.clone()).map_err(PipelineError::from)
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn execute(&self, config: &NodeConfig, inputs: &[HandlerOutput]) -> Result<HandlerOutput>;
}

fn config_value(config: &NodeConfig) -> serde_json::Value {
    serde_json::Value::Object(config.clone())
}

fn first_input<'a>(inputs: &'a [HandlerOutput]) -> Result<&'a HandlerOutput> {
    inputs
        .first()
        .ok_or_else(|| PipelineError::MissingInput("handler received no upstream input".into()))
}

/// Passes a single preloaded document straight through (§4, `loader`). A
/// real deployment would replace this with a file/URL/DB-backed loader; it
/// is kept generic over *where* text comes from by reading it straight out
/// of node config, matching how the engine injects seed documents.
pub struct LoaderHandler;

#[async_trait]
impl Handler for LoaderHandler {
    async fn execute(&self, config: &NodeConfig, _inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let value = config_value(config);
        let docs: Vec<LoadedDocument> = if value.get("documents").is_some() {
            serde_json::from_value(value.get("documents").unwrap().clone())?
        } else {
            vec![serde_json::from_value(value)?]
        };
        Ok(HandlerOutput::from_documents(docs))
    }
}

/// Dispatches to one of the eight chunking strategies (§4.1).
pub struct SplitterHandler {
    embedder: Option<Arc<dyn SentenceEmbedder>>,
}

impl SplitterHandler {
    pub fn new(embedder: Option<Arc<dyn SentenceEmbedder>>) -> Self {
        Self { embedder }
    }
}

#[derive(Deserialize)]
struct SplitterConfig {
    strategy: Strategy,
    #[serde(flatten)]
    params: ChunkParams,
}

#[async_trait]
impl Handler for SplitterHandler {
    async fn execute(&self, config: &NodeConfig, inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let splitter_config: SplitterConfig = serde_json::from_value(config_value(config))?;
        let docs = first_input(inputs)?.documents()?;

        let mut all_chunks = Vec::new();
        for doc in docs {
            let candidates = chunking::chunk(
                &doc.text,
                splitter_config.strategy,
                &splitter_config.params,
                self.embedder.as_deref(),
            )
            .await?;
            all_chunks.extend(candidates_into_chunks(&doc.id, candidates));
        }

        Ok(HandlerOutput::from_chunks(all_chunks))
    }
}

/// Embeds chunk text in one batch and forwards the model's per-token cost
/// onto each chunk's metadata (§8 supplemented cost-estimation feature).
pub struct EmbedderHandler {
    embedder: Arc<dyn Embedder>,
}

impl EmbedderHandler {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl Handler for EmbedderHandler {
    async fn execute(&self, _config: &NodeConfig, inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let mut chunks = first_input(inputs)?.chunks()?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(PipelineError::Internal(
                "embedder returned a mismatched number of vectors".into(),
            ));
        }

        let info = self.embedder.info();
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(embedding);
            if let Some(cost) = info.cost_per_1m_tokens {
                chunk
                    .metadata
                    .insert("embedding_cost_per_1m_tokens".into(), serde_json::json!(cost));
            }
        }

        Ok(HandlerOutput::from_chunks(chunks))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum VectorDbOp {
    Put,
    Get,
}

#[derive(Deserialize)]
struct VectorDbConfig {
    op: VectorDbOp,
    #[serde(default)]
    document_id: Option<String>,
}

/// Persists or retrieves chunks through a [`ChunkRepository`] (§4, `vector_db`).
pub struct VectorDbHandler {
    repository: Arc<dyn ChunkRepository>,
}

impl VectorDbHandler {
    pub fn new(repository: Arc<dyn ChunkRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Handler for VectorDbHandler {
    async fn execute(&self, config: &NodeConfig, inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let vdb_config: VectorDbConfig = serde_json::from_value(config_value(config))?;
        match vdb_config.op {
            VectorDbOp::Put => {
                let chunks = first_input(inputs)?.chunks()?;
                self.repository.put_chunks(chunks.clone()).await?;
                Ok(HandlerOutput::from_chunks(chunks))
            }
            VectorDbOp::Get => {
                let document_id = vdb_config.document_id.ok_or_else(|| {
                    PipelineError::InvalidConfig("vector_db get requires document_id".into())
                })?;
                let chunks = self.repository.get_chunks(&document_id).await?;
                Ok(HandlerOutput::from_chunks(chunks))
            }
        }
    }
}

#[derive(Deserialize)]
struct RetrieverConfig {
    strategy: String,
    query: String,
    #[serde(default)]
    query_embedding: Option<Vec<f32>>,
    #[serde(flatten)]
    params: RetrieverParams,
}

/// Runs a named, pre-wired [`Retriever`] over the upstream chunk corpus
/// (§4.2). Which strategies are available is decided when the registry is
/// assembled, not hardcoded here.
pub struct RetrieverHandler {
    retrievers: HashMap<String, Arc<dyn Retriever>>,
}

impl RetrieverHandler {
    pub fn new() -> Self {
        Self {
            retrievers: HashMap::new(),
        }
    }

    pub fn with_retriever(mut self, name: impl Into<String>, retriever: Arc<dyn Retriever>) -> Self {
        self.retrievers.insert(name.into(), retriever);
        self
    }
}

impl Default for RetrieverHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for RetrieverHandler {
    async fn execute(&self, config: &NodeConfig, inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let retriever_config: RetrieverConfig = serde_json::from_value(config_value(config))?;
        let retriever = self.retrievers.get(&retriever_config.strategy).ok_or_else(|| {
            PipelineError::InvalidConfig(format!(
                "retriever: unknown strategy '{}'",
                retriever_config.strategy
            ))
        })?;
        let corpus = first_input(inputs)?.chunks()?;

        let mut query = Query::new(retriever_config.query);
        if let Some(embedding) = retriever_config.query_embedding {
            query = query.with_embedding(embedding);
        }

        let results = retriever.retrieve(&query, &corpus, &retriever_config.params).await?;
        Ok(HandlerOutput::from_results(results))
    }
}

#[derive(Deserialize)]
struct RerankerConfig {
    query: String,
    #[serde(default = "default_rerank_top_k")]
    top_k: usize,
}

fn default_rerank_top_k() -> usize {
    10
}

/// Rescales an upstream candidate list through a [`RerankStrategy`] (§4.3).
pub struct RerankerHandler {
    strategy: Arc<dyn RerankStrategy>,
}

impl RerankerHandler {
    pub fn new(strategy: Arc<dyn RerankStrategy>) -> Self {
        Self { strategy }
    }
}

#[async_trait]
impl Handler for RerankerHandler {
    async fn execute(&self, config: &NodeConfig, inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let reranker_config: RerankerConfig = serde_json::from_value(config_value(config))?;
        let candidates = first_input(inputs)?.results()?;
        let reranked = self
            .strategy
            .rerank(&reranker_config.query, candidates, reranker_config.top_k)
            .await?;
        Ok(HandlerOutput::from_results(reranked))
    }
}

#[derive(Deserialize)]
struct LlmConfig {
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_context_chunks")]
    context_chunks: usize,
}

fn default_context_chunks() -> usize {
    5
}

/// Token usage reported alongside an `llm` node's completion. Counts are a
/// whitespace-split approximation, not a real tokenizer's count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// An `llm` node's structured output (§4.4 `llm`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub response: String,
    pub model: String,
    pub usage: LlmUsage,
}

fn approx_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Picks the upstream context to prepend to the configured prompt, in the
/// documented precedence: a document's `full_text`, else its
/// `text_preview`, else a prior `llm` node's `response`, else the text of
/// up to `limit` retrieved chunks (§4.4 `llm`).
fn compose_context(inputs: &[HandlerOutput], limit: usize) -> Option<String> {
    inputs
        .iter()
        .find_map(|input| input.0.get("full_text").and_then(|v| v.as_str()).map(str::to_string))
        .or_else(|| {
            inputs
                .iter()
                .find_map(|input| input.0.get("text_preview").and_then(|v| v.as_str()).map(str::to_string))
        })
        .or_else(|| {
            inputs
                .iter()
                .find_map(|input| input.0.get("response").and_then(|v| v.as_str()).map(str::to_string))
        })
        .or_else(|| top_chunk_texts(inputs, limit))
}

/// Joins the text of up to `limit` chunks drawn from the first input that
/// parses as retrieval results or chunks, in that order.
fn top_chunk_texts(inputs: &[HandlerOutput], limit: usize) -> Option<String> {
    for input in inputs {
        if let Ok(results) = input.results() {
            if !results.is_empty() {
                let texts: Vec<String> = results.into_iter().take(limit).map(|r| r.chunk.text).collect();
                return Some(texts.join("\n\n"));
            }
        }
        if let Ok(chunks) = input.chunks() {
            if !chunks.is_empty() {
                let texts: Vec<String> = chunks.into_iter().take(limit).map(|c| c.text).collect();
                return Some(texts.join("\n\n"));
            }
        }
    }
    None
}

/// Calls a single completion through the [`Llm`] port, composing the
/// configured prompt with whatever upstream context is available (§4.4
/// `llm`).
pub struct LlmHandler {
    llm: Arc<dyn Llm>,
}

impl LlmHandler {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Handler for LlmHandler {
    async fn execute(&self, config: &NodeConfig, inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let llm_config: LlmConfig = serde_json::from_value(config_value(config))?;

        let prompt = match compose_context(inputs, llm_config.context_chunks) {
            Some(context) if !context.trim().is_empty() => {
                format!("{}\n\nContext:\n{}", llm_config.prompt, context)
            }
            _ => llm_config.prompt.clone(),
        };

        let completion = self.llm.complete(&prompt).await?;
        let usage = LlmUsage {
            prompt_tokens: approx_tokens(&prompt),
            completion_tokens: approx_tokens(&completion),
            total_tokens: approx_tokens(&prompt) + approx_tokens(&completion),
        };

        Ok(HandlerOutput::from_llm_response(LlmResponse {
            response: completion,
            model: llm_config.model.unwrap_or_else(|| "unspecified".into()),
            usage,
        }))
    }
}

#[derive(Deserialize)]
struct AugmentorConfig {
    op: AugmentOp,
    query: String,
    #[serde(default = "default_num_variants")]
    num_variants: usize,
}

fn default_num_variants() -> usize {
    3
}

/// Expands a query via [`Augmentor`] (§4.4, `augmentor`).
pub struct AugmentorHandler {
    augmentor: Arc<Augmentor>,
}

impl AugmentorHandler {
    pub fn new(augmentor: Arc<Augmentor>) -> Self {
        Self { augmentor }
    }
}

#[async_trait]
impl Handler for AugmentorHandler {
    async fn execute(&self, config: &NodeConfig, _inputs: &[HandlerOutput]) -> Result<HandlerOutput> {
        let augmentor_config: AugmentorConfig = serde_json::from_value(config_value(config))?;
        let variants = self
            .augmentor
            .augment(augmentor_config.op, &augmentor_config.query, augmentor_config.num_variants)
            .await?;
        Ok(HandlerOutput::from_texts(variants))
    }
}

/// Static mapping from [`Kind`] to the [`Handler`] that executes it.
/// Graph admission rejects any node whose kind has no registered handler.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<Kind, Arc<dyn Handler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: Kind, handler: Arc<dyn Handler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn get(&self, kind: Kind) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Reject a graph referencing any `Kind` this registry has no handler
    /// for, before the engine schedules a single wave.
    pub fn validate_graph(&self, graph: &Graph) -> Result<()> {
        for node in graph.nodes.values() {
            if !self.handlers.contains_key(&node.kind) {
                return Err(PipelineError::InvalidGraph(format!(
                    "node '{}' has kind '{}' with no registered handler",
                    node.id, node.kind
                )));
            }
        }
        Ok(())
    }
}
