//! Scenario B: a cyclic graph is rejected at `Engine::run` time, before any
//! node is scheduled, with an `InvalidGraph` error naming the cycle.

mod common;

use std::sync::Arc;

use ragforge::config::EngineOptions;
use ragforge::engine::Engine;
use ragforge::error::ErrorKind;
use ragforge::graph::{Edge, Graph, Kind, Node};
use ragforge::ports::SystemClock;
use ragforge::registry::LoaderHandler;
use ragforge::Registry;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cyclic_graph_is_rejected_before_scheduling() {
    let mut registry = Registry::new();
    registry.register(Kind::Loader, Arc::new(LoaderHandler));

    let graph = Graph::new()
        .add_node(Node::new("A", Kind::Loader))
        .add_node(Node::new("B", Kind::Loader))
        .add_node(Node::new("C", Kind::Loader))
        .add_edge(Edge::new("A", "B"))
        .add_edge(Edge::new("B", "C"))
        .add_edge(Edge::new("C", "A"));

    let engine = Engine::new(Arc::new(registry), EngineOptions::default(), None, Arc::new(SystemClock));

    let err = engine
        .run(graph, "cycle-run", CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidGraph);
    assert!(err.to_string().contains("cycle"));
}

#[tokio::test]
async fn dangling_edge_is_rejected_alongside_any_cycle() {
    let mut registry = Registry::new();
    registry.register(Kind::Loader, Arc::new(LoaderHandler));

    let graph = Graph::new()
        .add_node(Node::new("A", Kind::Loader))
        .add_edge(Edge::new("A", "ghost"));

    let engine = Engine::new(Arc::new(registry), EngineOptions::default(), None, Arc::new(SystemClock));

    let err = engine
        .run(graph, "dangling-run", CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidGraph);
    assert!(err.to_string().contains("ghost"));
}
