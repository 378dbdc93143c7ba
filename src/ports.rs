//! External service ports (§8): the boundary the engine calls through.
//! Handlers depend on these traits, never on concrete HTTP/DB clients, so
//! fakes can stand in for integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunk::{Chunk, RetrievalResult};
use crate::error::Result;
use crate::graph::NodeId;

/// Static facts about an embedding model, surfaced to callers that need to
/// budget for cost (supplemented from `original_source`; not in the
/// distilled spec).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderInfo {
    pub model: String,
    pub dimensions: usize,
    #[serde(rename = "costPer1MTokens")]
    pub cost_per_1m_tokens: Option<f64>,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn info(&self) -> EmbedderInfo;
}

#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, candidates: &[RetrievalResult]) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait Llm: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>>;
    async fn put_chunks(&self, chunks: Vec<Chunk>) -> Result<()>;
    async fn get_chunk(&self, id: Uuid) -> Result<Option<Chunk>>;
    async fn get_chunks_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Chunk>>;
}

/// Wall-clock indirection so tests can fix "now" (§8 Clock port).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Per-node run status within one pipeline execution (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Degraded,
}

/// Run-level status, distinct from the per-node [`NodeStatus`] (§6 status
/// event schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// The full mutable state of one run, persisted opportunistically via
/// [`CheckpointStore`] so a crashed run can resume from the last completed
/// wave instead of restarting from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub run_id: String,
    pub node_status: HashMap<NodeId, NodeStatus>,
    pub node_outputs: HashMap<NodeId, serde_json::Value>,
    pub updated_at: DateTime<Utc>,
    pub status: RunStatus,
    /// Fraction of nodes completed, in `[0, 1]`. Monotone non-decreasing
    /// over a run; reaches exactly `1.0` iff `status` is `Completed`.
    pub progress: f64,
    pub current_nodes: Vec<NodeId>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionState {
    pub fn new(run_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            node_status: HashMap::new(),
            node_outputs: HashMap::new(),
            updated_at: now,
            status: RunStatus::Running,
            progress: 0.0,
            current_nodes: Vec::new(),
            error: None,
            started_at: now,
            completed_at: None,
        }
    }
}

/// A durable snapshot of an [`ExecutionState`] at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: String,
    pub state: ExecutionState,
    pub taken_at: DateTime<Utc>,
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;
    async fn load(&self, run_id: &str) -> Result<Option<Checkpoint>>;
    async fn delete(&self, run_id: &str) -> Result<()>;
}
