//! Scenario A: a full loader -> splitter -> embedder -> vector_db -> retriever
//! -> reranker -> llm pipeline runs end to end and every node completes.

mod common;

use std::sync::Arc;

use ragforge::config::EngineOptions;
use ragforge::engine::Engine;
use ragforge::graph::{Edge, Graph, Kind, Node};
use ragforge::ports::{NodeStatus, SystemClock};
use ragforge::registry::{
    EmbedderHandler, LlmHandler, LoaderHandler, RerankerHandler, RetrieverHandler, SplitterHandler,
    VectorDbHandler,
};
use ragforge::rerank::CrossEncoderReranker;
use ragforge::retrieval::DenseRetriever;
use ragforge::Registry;
use tokio_util::sync::CancellationToken;

use common::{EchoLlm, FakeEmbedder, InMemoryChunkRepository, ReverseReranker};

fn node_config(json: serde_json::Value) -> ragforge::graph::NodeConfig {
    match json {
        serde_json::Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

#[tokio::test]
async fn linear_pipeline_runs_to_completion() {
    let repository = Arc::new(InMemoryChunkRepository::new());

    let mut registry = Registry::new();
    registry.register(Kind::Loader, Arc::new(LoaderHandler));
    registry.register(Kind::Splitter, Arc::new(SplitterHandler::new(None)));
    registry.register(Kind::Embedder, Arc::new(EmbedderHandler::new(Arc::new(FakeEmbedder))));
    registry.register(Kind::VectorDb, Arc::new(VectorDbHandler::new(repository.clone())));
    registry.register(
        Kind::Retriever,
        Arc::new(RetrieverHandler::new().with_retriever("dense", Arc::new(DenseRetriever))),
    );
    registry.register(
        Kind::Reranker,
        Arc::new(RerankerHandler::new(Arc::new(CrossEncoderReranker::new(Arc::new(
            ReverseReranker,
        ))))),
    );
    registry.register(Kind::Llm, Arc::new(LlmHandler::new(Arc::new(EchoLlm))));

    let graph = Graph::new()
        .add_node(Node::new("load", Kind::Loader).with_config(node_config(serde_json::json!({
            "id": "doc1",
            "text": "Rust is a systems programming language focused on safety and speed."
        }))))
        .add_node(Node::new("split", Kind::Splitter).with_config(node_config(serde_json::json!({
            "strategy": "fixed",
            "chunk_size": 20,
            "overlap": 0
        }))))
        .add_node(Node::new("embed", Kind::Embedder))
        .add_node(Node::new("store", Kind::VectorDb).with_config(node_config(serde_json::json!({
            "op": "put"
        }))))
        .add_node(Node::new("retrieve", Kind::Retriever).with_config(node_config(serde_json::json!({
            "strategy": "dense",
            "query": "systems programming",
            "query_embedding": [0.4, 0.6],
            "top_k": 5
        }))))
        .add_node(Node::new("rerank", Kind::Reranker).with_config(node_config(serde_json::json!({
            "query": "systems programming",
            "top_k": 3
        }))))
        .add_node(Node::new("answer", Kind::Llm).with_config(node_config(serde_json::json!({
            "prompt": "summarize the retrieved chunks"
        }))))
        .add_edge(Edge::new("load", "split"))
        .add_edge(Edge::new("split", "embed"))
        .add_edge(Edge::new("embed", "store"))
        .add_edge(Edge::new("store", "retrieve"))
        .add_edge(Edge::new("retrieve", "rerank"))
        .add_edge(Edge::new("rerank", "answer"));

    let engine = Engine::new(Arc::new(registry), EngineOptions::default(), None, Arc::new(SystemClock));
    let state = engine
        .run(graph, "linear-run", CancellationToken::new())
        .await
        .expect("pipeline should complete");

    for node_id in ["load", "split", "embed", "store", "retrieve", "rerank", "answer"] {
        assert_eq!(
            state.node_status[&node_id.to_string()],
            NodeStatus::Completed,
            "node {node_id} should have completed"
        );
    }

    let answer_output = state.node_outputs[&"answer".to_string()].clone();
    let output = ragforge::registry::HandlerOutput(answer_output);
    let response = output.llm_response().unwrap();
    assert!(response.response.starts_with("answer:"));
}
