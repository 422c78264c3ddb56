//! Executor trait and execution context.
//!
//! The [`Executor`] trait is the engine's only extension point: one
//! implementation per node type, resolved by name through the registry. An
//! executor receives everything it may touch through its
//! [`ExecutionContext`]; it must not reach for ambient state and must not
//! assume a particular concurrency model.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::{LogKind, NodeStatus, RunContext};
use crate::error::Result;
use crate::graph::{Graph, Node};

/// Re-entrant dispatch capability.
///
/// Injected into executor contexts so control-flow nodes (the loop node) can
/// drive downstream execution themselves instead of recursing through hidden
/// closures. `dispatch` runs the node and its downstream subgraph, returning
/// the node's own output.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, node_id: &str, input: Value) -> Result<Value>;
}

/// Context passed to an executor for one node invocation.
pub struct ExecutionContext {
    /// The value propagated from the upstream neighbor (`null` for
    /// triggers).
    pub input: Value,

    /// The node being executed (id, type, data).
    pub node: Node,

    /// Read-only snapshot of the graph for this run.
    pub graph: Arc<Graph>,

    /// Shared run state: status map, input cells, log, cancel signal.
    pub run: Arc<RunContext>,

    /// Re-entrant dispatcher for control-flow executors.
    pub dispatcher: Arc<dyn Dispatch>,
}

impl ExecutionContext {
    /// The node's executor-specific configuration.
    pub fn data(&self) -> &Value {
        &self.node.data
    }

    /// Append a log entry attributed to this node.
    pub fn add_log(&self, kind: LogKind, message: impl Into<String>) {
        self.run.add_log(&self.node.id, kind, message);
    }

    /// Whether the run's cancel signal is set.
    pub fn is_cancelled(&self) -> bool {
        self.run.cancel().is_cancelled()
    }

    /// Snapshot of the full status map, for executors that need to read a
    /// different node's result.
    pub fn status_snapshot(&self) -> std::collections::HashMap<String, NodeStatus> {
        self.run.status_snapshot()
    }
}

/// Trait that all node executors implement.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The node type name this executor handles (e.g. "http", "if", "loop").
    fn node_type(&self) -> &str;

    /// Execute the node. The returned value becomes the node's output and is
    /// propagated to downstream nodes.
    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value>;

    /// Get a description of this node type.
    fn description(&self) -> &str {
        "A workflow node"
    }
}
