//! Scenario F: cancelling mid-run stops the pipeline cooperatively. A node
//! already in flight is allowed to finish its current unit of work, but no
//! further nodes are scheduled and the run reports `Cancelled`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragforge::config::EngineOptions;
use ragforge::engine::Engine;
use ragforge::error::ErrorKind;
use ragforge::graph::{Edge, Graph, Kind, Node, NodeConfig};
use ragforge::ports::SystemClock;
use ragforge::registry::{Handler, HandlerOutput, LoadedDocument};
use ragforge::Registry;
use tokio_util::sync::CancellationToken;

/// Sleeps for `delay` before completing, so the test has a window in which
/// to cancel the run while this node is still running.
struct SlowLoader {
    delay: Duration,
}

#[async_trait]
impl Handler for SlowLoader {
    async fn execute(&self, _config: &NodeConfig, _inputs: &[HandlerOutput]) -> ragforge::error::Result<HandlerOutput> {
        tokio::time::sleep(self.delay).await;
        Ok(HandlerOutput::from_documents(vec![LoadedDocument {
            id: "doc".into(),
            text: "slow".into(),
        }]))
    }
}

struct PassThrough;

#[async_trait]
impl Handler for PassThrough {
    async fn execute(&self, _config: &NodeConfig, inputs: &[HandlerOutput]) -> ragforge::error::Result<HandlerOutput> {
        Ok(inputs.first().cloned().unwrap_or(HandlerOutput(serde_json::Value::Null)))
    }
}

#[tokio::test]
async fn cancelling_mid_wave_yields_cancelled_without_running_downstream_nodes() {
    let mut registry = Registry::new();
    registry.register(
        Kind::Loader,
        Arc::new(SlowLoader {
            delay: Duration::from_millis(200),
        }),
    );
    registry.register(Kind::Splitter, Arc::new(PassThrough));

    let graph = Graph::new()
        .add_node(Node::new("L", Kind::Loader))
        .add_node(Node::new("S", Kind::Splitter))
        .add_edge(Edge::new("L", "S"));

    let engine = Engine::new(Arc::new(registry), EngineOptions::default(), None, Arc::new(SystemClock));
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_clone.cancel();
    });

    let err = engine
        .run(graph, "cancel-run", cancel)
        .await
        .expect_err("run should be cancelled before the splitter runs");

    assert_eq!(err.kind(), ErrorKind::Cancelled);
}
