//! Run controls.
//!
//! The [`Runner`] is the external surface of the engine: `start` drives one
//! graph to quiescence, `stop` requests cooperative cancellation of the
//! current run, and `status`/`log` expose the run's observable state to
//! pollers. One run at a time; starting while active is rejected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use super::dispatcher::Dispatcher;
use super::state::{LogEntry, NodeStatus, RunContext};
use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::graph::{validate_graph, Graph};
use crate::nodes::ExecutorRegistry;

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// True when the run was stopped by [`Runner::stop`]. A cancelled run is
    /// not a failed one; per-node outcomes live in the status map.
    pub cancelled: bool,
}

/// Workflow runner.
pub struct Runner {
    registry: Arc<ExecutorRegistry>,
    settings: EngineSettings,
    active: AtomicBool,
    current: RwLock<Option<Arc<RunContext>>>,
}

impl Runner {
    /// Create a runner over an executor registry.
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            settings: EngineSettings::default(),
            active: AtomicBool::new(false),
            current: RwLock::new(None),
        }
    }

    /// Override the engine settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Execute a graph from its triggers to quiescence.
    ///
    /// The graph is validated first and rejected outright on structural
    /// problems. While a run is active further `start` calls are rejected
    /// with [`Error::Execution`]. The previous run's status map and log are
    /// cleared here, at the start of the new run, never earlier.
    pub async fn start(&self, graph: Graph, input: Value) -> Result<RunSummary> {
        validate_graph(&graph)?;

        if self.active.swap(true, Ordering::SeqCst) {
            return Err(Error::Execution("A run is already active".to_string()));
        }

        let graph = Arc::new(graph);
        let run = Arc::new(RunContext::new(&graph, self.settings.clone()));
        *self.current.write().unwrap() = Some(Arc::clone(&run));

        info!(
            run_id = %run.run_id,
            nodes = graph.nodes.len(),
            "Starting run"
        );

        let dispatcher = Dispatcher::new(
            Arc::clone(&graph),
            Arc::clone(&self.registry),
            Arc::clone(&run),
        );

        let result = dispatcher.run(input).await;
        self.active.store(false, Ordering::SeqCst);

        let cancelled = match result {
            Ok(()) => false,
            Err(e) if e.is_cancelled() => true,
            Err(e) => {
                // Dispatch absorbs node failures; anything else is a
                // run-level defect worth surfacing.
                return Err(e);
            }
        };

        let summary = RunSummary {
            run_id: run.run_id.clone(),
            started_at: run.started_at,
            finished_at: Utc::now(),
            cancelled,
        };

        info!(
            run_id = %summary.run_id,
            cancelled = summary.cancelled,
            "Run finished"
        );

        Ok(summary)
    }

    /// Request cancellation of the current run.
    ///
    /// Returns false when no run is active. Cooperative: queued nodes will
    /// never start, running nodes finish or fail on their own.
    pub fn stop(&self) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        if let Some(run) = self.current.read().unwrap().as_ref() {
            run.cancel().request_cancel();
            true
        } else {
            false
        }
    }

    /// Snapshot of the per-node status map of the current (or most recent)
    /// run. Empty before the first run.
    pub fn status(&self) -> HashMap<String, NodeStatus> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|run| run.status_snapshot())
            .unwrap_or_default()
    }

    /// Snapshot of the execution log of the current (or most recent) run.
    pub fn log(&self) -> Vec<LogEntry> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|run| run.log_snapshot())
            .unwrap_or_default()
    }

    /// Whether a run is currently active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::NodeState;
    use crate::nodes::{ExecutionContext, Executor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    /// Adds 1 to an integer input, optionally sleeping first so tests can
    /// introduce timing jitter.
    struct AddOne {
        delay_ms: u64,
    }

    #[async_trait]
    impl Executor for AddOne {
        fn node_type(&self) -> &str {
            "add_one"
        }

        async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
            let n = ctx
                .input
                .as_i64()
                .ok_or_else(|| Error::Node("add_one requires integer input".to_string()))?;
            if self.delay_ms > 0 {
                // Later items finish faster than earlier ones.
                let jitter = self.delay_ms.saturating_sub((n as u64) * 5);
                tokio::time::sleep(Duration::from_millis(jitter)).await;
            }
            Ok(json!(n + 1))
        }
    }

    fn registry_with_add_one(delay_ms: u64) -> ExecutorRegistry {
        let mut registry = ExecutorRegistry::new();
        registry.register(std::sync::Arc::new(AddOne { delay_ms }));
        registry
    }

    fn branch_graph(cond_value: i64) -> Graph {
        serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {"payload": {"n": cond_value}}},
                {"id": "check", "type": "if", "data": {
                    "conditions": [{"field": "input.n", "operator": "gt", "value": 0}]
                }},
                {"id": "a", "type": "debug", "data": {"label": "true-path"}},
                {"id": "b", "type": "debug", "data": {"label": "false-path"}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "check"},
                {"id": "e2", "source": "check", "target": "a", "sourceHandle": "true"},
                {"id": "e3", "source": "check", "target": "b", "sourceHandle": "false"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_branch_true_runs_only_true_path() {
        let runner = Runner::new(ExecutorRegistry::new());
        let summary = runner.start(branch_graph(5), Value::Null).await.unwrap();
        assert!(!summary.cancelled);

        let status = runner.status();
        assert_eq!(status["a"].state, NodeState::Success);
        assert_eq!(status["b"].state, NodeState::Idle);
    }

    #[tokio::test]
    async fn test_branch_false_runs_only_false_path() {
        let runner = Runner::new(ExecutorRegistry::new());
        runner.start(branch_graph(-5), Value::Null).await.unwrap();

        let status = runner.status();
        assert_eq!(status["a"].state, NodeState::Idle);
        assert_eq!(status["b"].state, NodeState::Success);
    }

    #[tokio::test]
    async fn test_loop_collects_in_input_order() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {"payload": [1, 2]}},
                {"id": "each", "type": "loop", "data": {}},
                {"id": "inc", "type": "add_one", "data": {}},
                {"id": "done", "type": "debug", "data": {"label": "collected"}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "each"},
                {"id": "e2", "source": "each", "target": "inc", "sourceHandle": "loop"},
                {"id": "e3", "source": "each", "target": "done"}
            ]
        }))
        .unwrap();

        let runner = Runner::new(registry_with_add_one(0));
        runner.start(graph, Value::Null).await.unwrap();

        let status = runner.status();
        assert_eq!(status["each"].output, json!([2, 3]));
        // The accumulator was forwarded along the continuation edge.
        assert_eq!(status["done"].state, NodeState::Success);
        assert_eq!(status["done"].output, json!([2, 3]));
    }

    #[tokio::test]
    async fn test_loop_order_survives_timing_jitter() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {"payload": [1, 2, 3]}},
                {"id": "each", "type": "loop", "data": {}},
                {"id": "inc", "type": "add_one", "data": {}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "each"},
                {"id": "e2", "source": "each", "target": "inc", "sourceHandle": "loop"}
            ]
        }))
        .unwrap();

        // Earlier items sleep longer than later ones inside the executor.
        let runner = Runner::new(registry_with_add_one(30));
        runner.start(graph, Value::Null).await.unwrap();

        assert_eq!(runner.status()["each"].output, json!([2, 3, 4]));
    }

    #[tokio::test]
    async fn test_loop_body_invoked_once_per_item() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {"payload": ["a", "b", "c"]}},
                {"id": "each", "type": "loop", "data": {}},
                {"id": "body", "type": "debug", "data": {"label": "iteration"}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "each"},
                {"id": "e2", "source": "each", "target": "body", "sourceHandle": "loop"}
            ]
        }))
        .unwrap();

        let runner = Runner::new(ExecutorRegistry::new());
        runner.start(graph, Value::Null).await.unwrap();

        let iteration_logs: Vec<String> = runner
            .log()
            .iter()
            .filter(|e| e.node_id == "body" && e.message.contains("[iteration]"))
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(iteration_logs.len(), 3);
        assert!(iteration_logs[0].contains("\"a\""));
        assert!(iteration_logs[1].contains("\"b\""));
        assert!(iteration_logs[2].contains("\"c\""));

        assert_eq!(runner.status()["each"].output, json!(["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_stop_prevents_queued_node_from_running() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {"payload": {}}},
                {"id": "slow", "type": "wait", "data": {"seconds": 30}},
                {"id": "after", "type": "debug", "data": {}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "slow"},
                {"id": "e2", "source": "slow", "target": "after"}
            ]
        }))
        .unwrap();

        let runner = std::sync::Arc::new(Runner::new(ExecutorRegistry::new()));
        let handle = {
            let runner = std::sync::Arc::clone(&runner);
            tokio::spawn(async move { runner.start(graph, Value::Null).await })
        };

        // Let the run reach the wait node, then stop it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(runner.stop());

        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run did not observe stop")
            .unwrap()
            .unwrap();

        assert!(summary.cancelled);
        let status = runner.status();
        // The queued node never entered Running.
        assert_eq!(status["after"].state, NodeState::Idle);
    }

    #[tokio::test]
    async fn test_running_node_finishes_despite_stop() {
        /// Sleeps without observing the cancel signal, like an executor with
        /// no await point to interrupt.
        struct Oblivious;

        #[async_trait]
        impl Executor for Oblivious {
            fn node_type(&self) -> &str {
                "oblivious"
            }

            async fn execute(&self, _ctx: &ExecutionContext) -> Result<Value> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(json!("finished"))
            }
        }

        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {}},
                {"id": "busy", "type": "oblivious", "data": {}},
                {"id": "after", "type": "debug", "data": {}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "busy"},
                {"id": "e2", "source": "busy", "target": "after"}
            ]
        }))
        .unwrap();

        let mut registry = ExecutorRegistry::new();
        registry.register(std::sync::Arc::new(Oblivious));

        let runner = std::sync::Arc::new(Runner::new(registry));
        let handle = {
            let runner = std::sync::Arc::clone(&runner);
            tokio::spawn(async move { runner.start(graph, Value::Null).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(runner.stop());

        let summary = handle.await.unwrap().unwrap();
        assert!(summary.cancelled);

        let status = runner.status();
        // The node already in flight ran to completion; cancellation only
        // refused the next dispatch.
        assert_eq!(status["busy"].state, NodeState::Success);
        assert_eq!(status["busy"].output, json!("finished"));
        assert_eq!(status["after"].state, NodeState::Idle);
    }

    #[tokio::test]
    async fn test_stop_without_active_run() {
        let runner = Runner::new(ExecutorRegistry::new());
        assert!(!runner.stop());
    }

    #[tokio::test]
    async fn test_start_rejected_while_active() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {}},
                {"id": "slow", "type": "wait", "data": {"seconds": 30}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "slow"}
            ]
        }))
        .unwrap();

        let runner = std::sync::Arc::new(Runner::new(ExecutorRegistry::new()));
        let handle = {
            let runner = std::sync::Arc::clone(&runner);
            let graph = graph.clone();
            tokio::spawn(async move { runner.start(graph, Value::Null).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(runner.is_active());

        let err = runner.start(graph, Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("already active"));

        runner.stop();
        let summary = handle.await.unwrap().unwrap();
        assert!(summary.cancelled);
    }

    #[tokio::test]
    async fn test_invalid_graph_rejected_before_running() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [{"id": "start", "type": "trigger", "data": {}}],
            "edges": [{"id": "e1", "source": "start", "target": "ghost"}]
        }))
        .unwrap();

        let runner = Runner::new(ExecutorRegistry::new());
        let err = runner.start(graph, Value::Null).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        // Nothing ran, nothing was recorded.
        assert!(runner.status().is_empty());
        assert!(!runner.is_active());
    }

    #[tokio::test]
    async fn test_rerun_reproduces_terminal_topology() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {"payload": "not-an-int"}},
                {"id": "inc", "type": "add_one", "data": {}},
                {"id": "note", "type": "debug", "data": {}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "inc"},
                {"id": "e2", "source": "start", "target": "note"}
            ]
        }))
        .unwrap();

        let runner = Runner::new(registry_with_add_one(0));

        let mut topologies = Vec::new();
        for _ in 0..2 {
            runner.start(graph.clone(), Value::Null).await.unwrap();
            let mut topology: Vec<(String, String)> = runner
                .status()
                .into_iter()
                .map(|(id, s)| (id, s.state.to_string()))
                .collect();
            topology.sort();
            topologies.push(topology);
        }

        assert_eq!(topologies[0], topologies[1]);
        // And the topology is the expected one: inc failed, note succeeded.
        let status = runner.status();
        assert_eq!(status["inc"].state, NodeState::Error);
        assert_eq!(status["note"].state, NodeState::Success);
    }

    #[tokio::test]
    async fn test_every_reachable_node_reaches_terminal_state() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {"payload": {"n": 1}}},
                {"id": "check", "type": "if", "data": {
                    "conditions": [{"field": "input.n", "operator": "gt", "value": 0}]
                }},
                {"id": "yes", "type": "debug", "data": {}},
                {"id": "tag", "type": "set", "data": {
                    "fields": [{"name": "done", "value": true}]
                }},
                {"id": "fanout", "type": "debug", "data": {}}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "check"},
                {"id": "e2", "source": "check", "target": "yes", "sourceHandle": "true"},
                {"id": "e3", "source": "yes", "target": "tag"},
                {"id": "e4", "source": "yes", "target": "fanout"}
            ]
        }))
        .unwrap();

        let runner = Runner::new(ExecutorRegistry::new());
        runner.start(graph, Value::Null).await.unwrap();

        let status = runner.status();
        for id in ["start", "check", "yes", "tag", "fanout"] {
            assert!(
                matches!(status[id].state, NodeState::Success | NodeState::Error),
                "node '{}' did not reach a terminal state: {:?}",
                id,
                status[id].state
            );
        }
    }

    #[tokio::test]
    async fn test_log_cleared_at_next_start_not_before() {
        let graph = branch_graph(1);
        let runner = Runner::new(ExecutorRegistry::new());

        runner.start(graph.clone(), Value::Null).await.unwrap();
        let first_log = runner.log();
        assert!(!first_log.is_empty());

        // Still observable after the run finished.
        assert_eq!(runner.log().len(), first_log.len());

        runner.start(graph, Value::Null).await.unwrap();
        let second_log = runner.log();
        // Fresh log, not an accumulation across runs.
        assert_eq!(second_log.len(), first_log.len());
    }

    #[tokio::test]
    async fn test_seed_input_reaches_trigger_without_payload() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "start", "type": "trigger", "data": {}},
                {"id": "echo", "type": "debug", "data": {}}
            ],
            "edges": [{"id": "e1", "source": "start", "target": "echo"}]
        }))
        .unwrap();

        let runner = Runner::new(ExecutorRegistry::new());
        runner.start(graph, json!({"seeded": true})).await.unwrap();

        assert_eq!(runner.status()["echo"].output, json!({"seeded": true}));
    }
}
