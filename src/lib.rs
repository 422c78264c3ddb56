//! weft - directed-graph workflow execution engine
//!
//! weft executes the node/edge graphs a visual editor produces: it walks the
//! graph from its trigger nodes, invokes a per-node-type executor, propagates
//! each output as the input of downstream nodes, filters branch edges by
//! named source handles, drives loop nodes one array item at a time, and
//! supports cooperative mid-run cancellation.
//!
//! ## Key properties
//!
//! - **Registry-dispatched executors**: one [`Executor`](nodes::Executor)
//!   per node type; unknown types pass input through unchanged
//! - **Observable runs**: a per-node status map and an append-only execution
//!   log, pollable while the run is in flight
//! - **Cooperative cancellation**: `stop()` prevents queued nodes from
//!   starting; running executors observe the same signal at their await
//!   points
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::{json, Value};
//! use weft::engine::Runner;
//! use weft::graph::Graph;
//! use weft::nodes::ExecutorRegistry;
//!
//! # async fn run() -> weft::Result<()> {
//! let graph: Graph = serde_json::from_value(json!({
//!     "nodes": [
//!         {"id": "start", "type": "trigger", "data": {"payload": {"n": 1}}},
//!         {"id": "check", "type": "if", "data": {
//!             "conditions": [{"field": "input.n", "operator": "gt", "value": 0}]
//!         }},
//!         {"id": "report", "type": "debug", "data": {"label": "positive"}}
//!     ],
//!     "edges": [
//!         {"id": "e1", "source": "start", "target": "check"},
//!         {"id": "e2", "source": "check", "target": "report", "sourceHandle": "true"}
//!     ]
//! }))?;
//!
//! let runner = Runner::new(ExecutorRegistry::new());
//! let summary = runner.start(graph, Value::Null).await?;
//! println!("run {} cancelled={}", summary.run_id, summary.cancelled);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod nodes;

pub use config::EngineSettings;
pub use engine::{LogEntry, LogKind, NodeState, NodeStatus, RunSummary, Runner};
pub use error::{Error, Result};
pub use graph::{Edge, Graph, Node};
pub use nodes::{ExecutionContext, Executor, ExecutorRegistry};
