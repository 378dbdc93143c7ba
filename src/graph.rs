//! Pipeline graph data model (§3): nodes, edges, the closed `Kind` set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque node identity, unique within a graph.
pub type NodeId = String;

/// The closed set of stage kinds a node may declare. Unknown kinds are
/// rejected at deserialization time, not at execution time — admission-time
/// rejection per the registry redesign in §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Loader,
    Splitter,
    Embedder,
    VectorDb,
    Retriever,
    Reranker,
    Llm,
    Augmentor,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Loader => "loader",
            Kind::Splitter => "splitter",
            Kind::Embedder => "embedder",
            Kind::VectorDb => "vector_db",
            Kind::Retriever => "retriever",
            Kind::Reranker => "reranker",
            Kind::Llm => "llm",
            Kind::Augmentor => "augmentor",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node's opaque configuration, interpreted by its handler. Keys are
/// recognized per handler; an unrecognized key is the handler's
/// `InvalidConfig` to raise, not the graph's.
pub type NodeConfig = serde_json::Map<String, serde_json::Value>;

/// A pipeline stage. Immutable after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: Kind,
    #[serde(default)]
    pub config: NodeConfig,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: Kind) -> Self {
        Self {
            id: id.into(),
            kind,
            config: NodeConfig::new(),
        }
    }

    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }
}

/// A directed edge between two nodes, by id. Multi-edges and self-loops are
/// disallowed (checked by the validator, not encoded in the type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A pipeline submission: nodes keyed by id, plus an ordered edge list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: HashMap<NodeId, Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(mut self, node: Node) -> Self {
        self.nodes.insert(node.id.clone(), node);
        self
    }

    pub fn add_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Outgoing edges for `id`, in submission order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Incoming edges for `id`, in submission order.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == id)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
