//! Execution engine (§6): a fixed-size worker pool draining a shared ready
//! queue, not one task per node. A global worker cap `W` bounds total
//! concurrency; a separate rate gate `R` further restricts the
//! embedder/llm/reranker kinds. Status transitions are broadcast as
//! idempotent events and checkpoints are written opportunistically so a
//! crashed run can resume from its last completed wave.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, Result};
use crate::graph::{Graph, Kind, NodeId};
use crate::ports::{Checkpoint, CheckpointStore, Clock, ExecutionState, NodeStatus, RunStatus};
use crate::registry::{HandlerOutput, Registry};
use crate::validate::{self, in_degrees};

/// One status transition or run-level outcome, broadcast for observers.
/// Applying the same event twice is a no-op from the receiver's point of
/// view since every event simply restates `ExecutionState` as of that
/// moment (§5 Non-goals: retained observability surface).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
    NodeStatusChanged {
        run_id: String,
        node_id: NodeId,
        status: NodeStatus,
    },
    /// Mirrors the §6 status event schema: `{runID, status, progress,
    /// currentNodes, error?, startedAt, completedAt?}`.
    RunStatusChanged {
        run_id: String,
        status: RunStatus,
        progress: f64,
        current_nodes: Vec<NodeId>,
        error: Option<String>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    },
}

fn run_status_event(state: &ExecutionState) -> ExecutionEvent {
    ExecutionEvent::RunStatusChanged {
        run_id: state.run_id.clone(),
        status: state.status,
        progress: state.progress,
        current_nodes: state.current_nodes.clone(),
        error: state.error.clone(),
        started_at: state.started_at,
        completed_at: state.completed_at,
    }
}

/// A counting permit pool for the embedder/llm/reranker rate gate, backed by
/// a bounded `flume` channel of unit tokens.
struct RateGate {
    tx: flume::Sender<()>,
    rx: flume::Receiver<()>,
}

impl RateGate {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = flume::bounded(capacity.max(1));
        for _ in 0..capacity.max(1) {
            let _ = tx.try_send(());
        }
        Self { tx, rx }
    }

    async fn acquire(&self) -> RateGatePermit {
        self.rx.recv_async().await.ok();
        RateGatePermit { tx: self.tx.clone() }
    }
}

struct RateGatePermit {
    tx: flume::Sender<()>,
}

impl Drop for RateGatePermit {
    fn drop(&mut self) {
        let _ = self.tx.try_send(());
    }
}

struct Inner {
    state: ExecutionState,
    in_degrees: HashMap<NodeId, usize>,
    completed: usize,
    total: usize,
    failure: Option<PipelineError>,
    last_checkpoint: Instant,
}

/// Runs pipeline graphs against a [`Registry`] of handlers.
pub struct Engine {
    registry: Arc<Registry>,
    options: crate::config::EngineOptions,
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ExecutionEvent>,
}

impl Engine {
    pub fn new(
        registry: Arc<Registry>,
        options: crate::config::EngineOptions,
        checkpoint_store: Option<Arc<dyn CheckpointStore>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            registry,
            options,
            checkpoint_store,
            clock,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    /// Execute `graph` to completion (or failure/cancellation), returning
    /// the final [`ExecutionState`]. `cancel` lets a caller stop the run
    /// cooperatively; handlers already in flight are allowed to finish their
    /// current unit of work.
    pub async fn run(
        &self,
        graph: Graph,
        run_id: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<ExecutionState> {
        let run_id = run_id.into();
        self.options.validate()?;

        let report = validate::validate(&graph);
        if !report.is_ok() {
            let messages: Vec<String> = report.errors.into_iter().map(|e| e.message).collect();
            return Err(PipelineError::InvalidGraph(messages.join("; ")));
        }
        self.registry.validate_graph(&graph)?;

        let graph = Arc::new(graph);
        let mut degrees = in_degrees(&graph);
        let total = graph.nodes.len();

        let mut state = ExecutionState::new(run_id.clone(), self.clock.now());
        for id in graph.nodes.keys() {
            state.node_status.insert(id.clone(), NodeStatus::Pending);
        }

        // Resume: nodes whose output survived in a prior checkpoint are
        // pre-marked complete and their successors' in-degrees drop
        // accordingly, so a re-run of an unchanged graph replays no handler
        // (§6 Checkpointing).
        let mut pre_completed = Vec::new();
        if let Some(store) = &self.checkpoint_store {
            if let Some(checkpoint) = store.load(&run_id).await? {
                for (id, output) in &checkpoint.state.node_outputs {
                    if graph.nodes.contains_key(id) {
                        state.node_status.insert(id.clone(), NodeStatus::Completed);
                        state.node_outputs.insert(id.clone(), output.clone());
                        pre_completed.push(id.clone());
                    }
                }
                for id in &pre_completed {
                    for edge in graph.outgoing(id) {
                        if let Some(degree) = degrees.get_mut(&edge.target) {
                            *degree = degree.saturating_sub(1);
                        }
                    }
                }
                if !pre_completed.is_empty() {
                    info!(run_id = %run_id, resumed = pre_completed.len(), "resumed nodes from checkpoint");
                }
            }
        }

        let completed = pre_completed.len();
        state.progress = if total == 0 { 1.0 } else { completed as f64 / total as f64 };

        let inner = Arc::new(AsyncMutex::new(Inner {
            state,
            in_degrees: degrees.clone(),
            completed,
            total,
            failure: None,
            last_checkpoint: Instant::now(),
        }));

        for id in &pre_completed {
            let _ = self.events.send(ExecutionEvent::NodeStatusChanged {
                run_id: run_id.clone(),
                node_id: id.clone(),
                status: NodeStatus::Completed,
            });
        }
        {
            let guard = inner.lock().await;
            let _ = self.events.send(run_status_event(&guard.state));
        }

        let (ready_tx, ready_rx) = flume::unbounded::<NodeId>();
        let pre_completed_set: std::collections::HashSet<NodeId> = pre_completed.into_iter().collect();
        for (id, degree) in &degrees {
            if *degree == 0 && !pre_completed_set.contains(id) {
                let _ = ready_tx.send(id.clone());
            }
        }

        let rate_gate = Arc::new(RateGate::new(self.options.rate_gate_capacity));
        let done = CancellationToken::new();

        let mut workers = Vec::new();
        for _ in 0..self.options.max_workers {
            let ready_rx = ready_rx.clone();
            let ready_tx = ready_tx.clone();
            let graph = graph.clone();
            let inner = inner.clone();
            let registry = self.registry.clone();
            let options_clone = self.options.clone();
            let rate_gate = rate_gate.clone();
            let cancel = cancel.clone();
            let done = done.clone();
            let events = self.events.clone();
            let checkpoint_store = self.checkpoint_store.clone();
            let clock = self.clock.clone();
            let run_id = run_id.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = done.cancelled() => break,
                        _ = cancel.cancelled() => {
                            done.cancel();
                            break;
                        }
                        recv = ready_rx.recv_async() => {
                            match recv {
                                Err(_) => break,
                                Ok(node_id) => {
                                    process_node(
                                        node_id,
                                        &graph,
                                        &inner,
                                        &registry,
                                        &options_clone,
                                        &rate_gate,
                                        &cancel,
                                        &done,
                                        &events,
                                        &checkpoint_store,
                                        clock.as_ref(),
                                        &run_id,
                                        &ready_tx,
                                    )
                                    .await;
                                }
                            }
                        }
                    }
                }
            }));
        }
        drop(ready_tx);
        drop(ready_rx);

        for worker in workers {
            let _ = worker.await;
        }

        let mut guard = inner.lock().await;
        guard.state.current_nodes.clear();
        guard.state.completed_at = Some(self.clock.now());

        if cancel.is_cancelled() && guard.failure.is_none() {
            guard.state.status = RunStatus::Cancelled;
            guard.state.error = Some(PipelineError::Cancelled.to_string());
            let _ = self.events.send(run_status_event(&guard.state));
            return Err(PipelineError::Cancelled);
        }
        if let Some(err) = guard.failure.take() {
            guard.state.status = RunStatus::Failed;
            guard.state.error = Some(err.to_string());
            let _ = self.events.send(run_status_event(&guard.state));
            return Err(err);
        }

        guard.state.status = RunStatus::Completed;
        guard.state.progress = 1.0;
        let _ = self.events.send(run_status_event(&guard.state));
        Ok(guard.state.clone())
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_node(
    node_id: NodeId,
    graph: &Arc<Graph>,
    inner: &Arc<AsyncMutex<Inner>>,
    registry: &Arc<Registry>,
    options: &crate::config::EngineOptions,
    rate_gate: &Arc<RateGate>,
    cancel: &CancellationToken,
    done: &CancellationToken,
    events: &broadcast::Sender<ExecutionEvent>,
    checkpoint_store: &Option<Arc<dyn CheckpointStore>>,
    clock: &dyn Clock,
    run_id: &str,
    ready_tx: &flume::Sender<NodeId>,
) {
    let node = match graph.nodes.get(&node_id) {
        Some(n) => n.clone(),
        None => return,
    };

    let inputs: Vec<HandlerOutput> = {
        let guard = inner.lock().await;
        graph
            .incoming(&node_id)
            .filter_map(|edge| guard.state.node_outputs.get(&edge.source).cloned())
            .map(HandlerOutput)
            .collect()
    };

    {
        let mut guard = inner.lock().await;
        guard.state.node_status.insert(node_id.clone(), NodeStatus::Running);
        guard.state.current_nodes.push(node_id.clone());
    }
    let _ = events.send(ExecutionEvent::NodeStatusChanged {
        run_id: run_id.to_string(),
        node_id: node_id.clone(),
        status: NodeStatus::Running,
    });

    let _permit = if crate::config::EngineOptions::is_rate_gated(node.kind) {
        Some(rate_gate.acquire().await)
    } else {
        None
    };

    let handler = registry.get(node.kind);
    let timeout = options.timeout_for(node.kind);

    let outcome: Result<HandlerOutput> = match handler {
        None => Err(PipelineError::InvalidGraph(format!(
            "node '{node_id}' has no registered handler for kind '{}'",
            node.kind
        ))),
        Some(handler) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                _ = done.cancelled() => Err(PipelineError::Cancelled),
                result = tokio::time::timeout(timeout, handler.execute(&node.config, &inputs)) => {
                    match result {
                        Ok(inner_result) => inner_result,
                        Err(_) => Err(PipelineError::Timeout(timeout)),
                    }
                }
            }
        }
    };

    let degrades_here = matches!(node.kind, Kind::Reranker | Kind::Augmentor);

    let (status, output, hard_failure) = match outcome {
        Ok(output) => (NodeStatus::Completed, Some(output), None),
        Err(err) if degrades_here && err.degrades() => {
            warn!(node = %node_id, kind = %node.kind, error = %err, "node degraded");
            let passthrough = inputs.first().cloned().unwrap_or(HandlerOutput(serde_json::Value::Null));
            (NodeStatus::Degraded, Some(passthrough), None)
        }
        Err(err) => {
            error!(node = %node_id, kind = %node.kind, error = %err, "node failed");
            (NodeStatus::Failed, None, Some(err))
        }
    };

    let mut newly_ready = Vec::new();
    let mut should_stop = false;
    let mut queue_drained = false;

    {
        let mut guard = inner.lock().await;
        guard.state.node_status.insert(node_id.clone(), status);
        guard.state.current_nodes.retain(|id| id != &node_id);
        if let Some(output) = &output {
            guard.state.node_outputs.insert(node_id.clone(), output.0.clone());
        }
        guard.state.updated_at = clock.now();

        if let Some(err) = hard_failure {
            // Keep the first failure: a sibling node racing to finish after
            // `done` fires would otherwise overwrite the real cause with its
            // own downstream `Cancelled`.
            if guard.failure.is_none() {
                guard.failure = Some(err);
            }
            should_stop = true;
        } else {
            for edge in graph.outgoing(&node_id) {
                if let Some(degree) = guard.in_degrees.get_mut(&edge.target) {
                    *degree -= 1;
                    if *degree == 0 {
                        newly_ready.push(edge.target.clone());
                    }
                }
            }
        }

        guard.completed += 1;
        guard.state.progress = if guard.total == 0 {
            1.0
        } else {
            guard.completed as f64 / guard.total as f64
        };
        if guard.completed >= guard.total {
            should_stop = true;
        }

        if options.checkpoint_on_wave_boundary && newly_ready.is_empty() {
            queue_drained = true;
        }
        let elapsed = guard.last_checkpoint.elapsed();
        let due_by_interval = elapsed >= Duration::from_secs(options.checkpoint_interval_secs);

        if let Some(store) = checkpoint_store {
            if due_by_interval || queue_drained {
                guard.last_checkpoint = Instant::now();
                let checkpoint = Checkpoint {
                    run_id: run_id.to_string(),
                    state: guard.state.clone(),
                    taken_at: clock.now(),
                };
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(err) = store.save(&checkpoint).await {
                        debug!(error = %err, "checkpoint write failed");
                    }
                });
            }
        }
    }

    let _ = events.send(ExecutionEvent::NodeStatusChanged {
        run_id: run_id.to_string(),
        node_id: node_id.clone(),
        status,
    });
    {
        let guard = inner.lock().await;
        let _ = events.send(run_status_event(&guard.state));
    }

    if should_stop {
        done.cancel();
        return;
    }

    for id in newly_ready {
        let _ = ready_tx.send(id);
    }

    info!(node = %node_id, ?status, "node finished");
}
