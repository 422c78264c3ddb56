//! Per-run execution state.
//!
//! One [`RunContext`] exists per run and owns everything mutable about it:
//! the per-node status map, the per-node input cells, the append-only
//! execution log, and the cancel signal. All mutation routes through its
//! methods; the runner and tests observe state through snapshots.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::cancel::CancelSignal;
use crate::config::EngineSettings;
use crate::graph::Graph;

/// Per-node lifecycle state. Terminal once `Success` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Idle,
    Running,
    Success,
    Error,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The externally observable status of one node within one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub state: NodeState,

    /// Output recorded on success, `null` otherwise.
    #[serde(default)]
    pub output: Value,

    /// Failure message recorded on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeStatus {
    fn idle() -> Self {
        Self {
            state: NodeState::Idle,
            output: Value::Null,
            error: None,
        }
    }
}

/// Severity of an execution log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Success,
    Error,
}

/// One entry in the append-only execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub node_id: String,
    pub message: String,
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
}

/// Shared mutable state for one run.
///
/// Locks guard short critical sections and are never held across an await.
pub struct RunContext {
    /// Unique run ID.
    pub run_id: String,

    /// When the run was created.
    pub started_at: DateTime<Utc>,

    statuses: RwLock<HashMap<String, NodeStatus>>,
    inputs: RwLock<HashMap<String, Value>>,
    log: RwLock<Vec<LogEntry>>,
    log_overflowed: RwLock<bool>,
    cancel: CancelSignal,
    settings: EngineSettings,
}

impl RunContext {
    /// Create fresh state for a run over `graph`: every node `Idle`, empty
    /// log, clear cancel signal.
    pub fn new(graph: &Graph, settings: EngineSettings) -> Self {
        let statuses = graph
            .nodes
            .iter()
            .map(|n| (n.id.clone(), NodeStatus::idle()))
            .collect();

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            statuses: RwLock::new(statuses),
            inputs: RwLock::new(HashMap::new()),
            log: RwLock::new(Vec::new()),
            log_overflowed: RwLock::new(false),
            cancel: CancelSignal::new(),
            settings,
        }
    }

    /// The run's cancel signal.
    pub fn cancel(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Engine limits in force for this run.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Mark a node `Running`.
    pub fn mark_running(&self, node_id: &str) {
        let mut statuses = self.statuses.write().unwrap();
        statuses.insert(
            node_id.to_string(),
            NodeStatus {
                state: NodeState::Running,
                output: Value::Null,
                error: None,
            },
        );
    }

    /// Mark a node `Success` with its output.
    pub fn mark_success(&self, node_id: &str, output: Value) {
        let mut statuses = self.statuses.write().unwrap();
        statuses.insert(
            node_id.to_string(),
            NodeStatus {
                state: NodeState::Success,
                output,
                error: None,
            },
        );
    }

    /// Mark a node `Error` with the failure message.
    pub fn mark_error(&self, node_id: &str, message: &str) {
        let mut statuses = self.statuses.write().unwrap();
        statuses.insert(
            node_id.to_string(),
            NodeStatus {
                state: NodeState::Error,
                output: Value::Null,
                error: Some(message.to_string()),
            },
        );
    }

    /// The current status of one node. `None` for IDs outside the graph.
    pub fn status_of(&self, node_id: &str) -> Option<NodeStatus> {
        self.statuses.read().unwrap().get(node_id).cloned()
    }

    /// Snapshot of the full status map.
    pub fn status_snapshot(&self) -> HashMap<String, NodeStatus> {
        self.statuses.read().unwrap().clone()
    }

    /// Record the latest value propagated to a node. A cell, not a queue:
    /// each upstream completion overwrites it.
    pub fn set_input(&self, node_id: &str, input: Value) {
        self.inputs
            .write()
            .unwrap()
            .insert(node_id.to_string(), input);
    }

    /// The last value propagated to a node, if any.
    pub fn input_of(&self, node_id: &str) -> Option<Value> {
        self.inputs.read().unwrap().get(node_id).cloned()
    }

    /// Append a log entry, mirroring it to `tracing`.
    pub fn add_log(&self, node_id: &str, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            LogKind::Info => debug!(node_id, "{}", message),
            LogKind::Success => info!(node_id, "{}", message),
            LogKind::Error => error!(node_id, "{}", message),
        }

        let mut log = self.log.write().unwrap();
        if log.len() >= self.settings.max_log_entries {
            log.remove(0);
            let mut overflowed = self.log_overflowed.write().unwrap();
            if !*overflowed {
                warn!(
                    run_id = %self.run_id,
                    "Execution log reached {} entries, dropping oldest",
                    self.settings.max_log_entries
                );
                *overflowed = true;
            }
        }
        log.push(LogEntry {
            node_id: node_id.to_string(),
            message,
            kind,
            timestamp: Utc::now(),
        });
    }

    /// Snapshot of the execution log, in append order.
    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.log.read().unwrap().clone()
    }
}
