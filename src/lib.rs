//! ragforge: a concurrent DAG execution engine for retrieval-augmented
//! generation pipelines.
//!
//! A pipeline is a [`graph::Graph`] of typed stages (`loader`, `splitter`,
//! `embedder`, `vector_db`, `retriever`, `reranker`, `llm`, `augmentor`).
//! [`validate`] checks a graph before it ever runs; [`registry`] maps each
//! stage's [`graph::Kind`] to the [`registry::Handler`] that executes it;
//! [`engine`] schedules a validated graph's nodes across a bounded worker
//! pool, wave by wave, respecting a shared rate gate for external-service
//! stages.
//!
//! The [`chunking`], [`retrieval`] and [`rerank`] modules are the algorithm
//! libraries most handlers delegate to; [`augment`] backs the `augmentor`
//! stage; [`ports`] defines the external service boundary (embedder, LLM,
//! reranker, chunk repository, checkpoint store, clock) that keeps handler
//! logic testable without a network.

pub mod augment;
pub mod checkpoint;
pub mod chunk;
pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ports;
pub mod registry;
pub mod rerank;
pub mod retrieval;
pub mod validate;

pub use chunk::{Chunk, ChunkCandidate, RetrievalResult};
pub use config::EngineOptions;
pub use engine::{Engine, ExecutionEvent};
pub use error::{ErrorKind, PipelineError, Result};
pub use graph::{Edge, Graph, Kind, Node, NodeConfig, NodeId};
pub use ports::{ExecutionState, NodeStatus, RunStatus};
pub use registry::{Handler, Registry};
