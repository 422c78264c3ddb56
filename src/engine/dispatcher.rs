//! Workflow dispatcher.
//!
//! The [`Dispatcher`] walks the graph from its trigger nodes, invokes each
//! node's executor via the registry, propagates outputs along edges, filters
//! branch edges by `sourceHandle`, special-cases loop nodes (their body is
//! driven by their own executor), and refuses to start new nodes once the
//! run's cancel signal is set.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::state::{LogKind, RunContext};
use crate::error::{Error, Result};
use crate::graph::{Edge, Graph, LOOP_NODE_TYPE};
use crate::nodes::{Dispatch, ExecutionContext, ExecutorRegistry};

/// Source handle that fires only on a true branch outcome.
const TRUE_HANDLE: &str = "true";

/// Source handle that fires only on a false branch outcome.
const FALSE_HANDLE: &str = "false";

/// Output key a branching node uses to expose its boolean outcome.
pub const CONDITION_RESULT_KEY: &str = "condition_result";

/// Graph traversal driver for one run.
///
/// Cheap to clone: all fields are shared handles. A clone wrapped in
/// `Arc<dyn Dispatch>` is injected into every executor context so
/// control-flow executors can re-enter the engine.
#[derive(Clone)]
pub struct Dispatcher {
    graph: Arc<Graph>,
    registry: Arc<ExecutorRegistry>,
    run: Arc<RunContext>,
}

impl Dispatcher {
    pub fn new(graph: Arc<Graph>, registry: Arc<ExecutorRegistry>, run: Arc<RunContext>) -> Self {
        Self {
            graph,
            registry,
            run,
        }
    }

    /// Execute the graph from its trigger nodes to quiescence.
    ///
    /// Triggers run sequentially, each seeding its branch with `seed`
    /// (`null` when the caller has nothing to inject). A failed branch stops
    /// only itself; remaining triggers still run. Only cancellation aborts
    /// the whole run.
    pub async fn run(&self, seed: Value) -> Result<()> {
        let trigger_ids: Vec<String> = self
            .graph
            .trigger_nodes()
            .iter()
            .map(|n| n.id.clone())
            .collect();

        for trigger_id in trigger_ids {
            match self.dispatch_node(&trigger_id, seed.clone()).await {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Err(Error::Cancelled),
                Err(e) => {
                    debug!(
                        "Trigger '{}' branch stopped: {} (independent triggers continue)",
                        trigger_id, e
                    );
                }
            }
        }

        Ok(())
    }

    /// Execute one node and its downstream subgraph.
    ///
    /// Returns the node's own output on success. An error return means this
    /// node itself failed (or the run was cancelled); failures deeper in the
    /// subgraph are absorbed at the edge where they occurred.
    fn dispatch_node<'a>(
        &'a self,
        node_id: &'a str,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(async move {
            let node = self
                .graph
                .get_node(node_id)
                .ok_or_else(|| Error::Execution(format!("Unknown node id '{}'", node_id)))?
                .clone();

            // Cancellation is observed at dispatch boundaries only: a node
            // that has not started never enters Running.
            if self.run.cancel().is_cancelled() {
                self.run
                    .add_log(node_id, LogKind::Info, "Dispatch refused: run cancelled");
                return Err(Error::Cancelled);
            }

            self.run.set_input(node_id, input.clone());
            self.run.mark_running(node_id);
            self.run.add_log(
                node_id,
                LogKind::Info,
                format!("Executing node [{}]", node.node_type),
            );

            let result = match self.registry.get(&node.node_type) {
                Some(executor) => {
                    let ctx = ExecutionContext {
                        input,
                        node: node.clone(),
                        graph: Arc::clone(&self.graph),
                        run: Arc::clone(&self.run),
                        dispatcher: Arc::new(self.clone()),
                    };
                    executor.execute(&ctx).await
                }
                // Unknown node type: identity pass-through. A deliberate
                // permissive default, not an error.
                None => {
                    debug!(
                        "No executor for type '{}', passing input through",
                        node.node_type
                    );
                    Ok(input)
                }
            };

            let output = match result {
                Ok(output) => output,
                Err(e) if e.is_cancelled() => {
                    self.run.mark_error(node_id, &e.to_string());
                    self.run
                        .add_log(node_id, LogKind::Info, "Node execution cancelled");
                    return Err(Error::Cancelled);
                }
                Err(e) => {
                    let message = e.to_string();
                    self.run.mark_error(node_id, &message);
                    self.run.add_log(node_id, LogKind::Error, message);
                    return Err(e);
                }
            };

            self.run.mark_success(node_id, output.clone());
            self.run
                .add_log(node_id, LogKind::Success, "Node completed");

            self.follow_downstream(&node.id, &node.node_type, &output)
                .await?;

            Ok(output)
        })
    }

    /// Follow the node's outgoing edges, propagating `output` to each
    /// followed target.
    ///
    /// Branch-tagged edges are filtered by the output's boolean outcome. A
    /// loop node's body edge is skipped: its executor already drove those
    /// dispatches, and only the continuation edges receive the accumulator.
    /// A failing target stops its own branch; sibling edges proceed.
    async fn follow_downstream(
        &self,
        node_id: &str,
        node_type: &str,
        output: &Value,
    ) -> Result<()> {
        let body_edge_id = if node_type == LOOP_NODE_TYPE {
            self.graph.loop_body_edge(node_id).map(|e| e.id.clone())
        } else {
            None
        };

        let targets: Vec<(String, String)> = self
            .graph
            .outgoing_edges(node_id)
            .into_iter()
            .filter(|e| Some(e.id.as_str()) != body_edge_id.as_deref())
            .filter(|e| edge_is_followed(e, output))
            .map(|e| (e.id.clone(), e.target.clone()))
            .collect();

        for (edge_id, target) in targets {
            match self.dispatch_node(&target, output.clone()).await {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Err(Error::Cancelled),
                Err(e) => {
                    debug!(
                        "Branch via edge '{}' stopped at '{}': {}",
                        edge_id, target, e
                    );
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Dispatch for Dispatcher {
    async fn dispatch(&self, node_id: &str, input: Value) -> Result<Value> {
        self.dispatch_node(node_id, input).await
    }
}

/// Whether an edge fires for the given source output.
///
/// `"true"`/`"false"` handles consult the output's boolean outcome; any
/// other (or absent) handle is an unconditional default path.
fn edge_is_followed(edge: &Edge, output: &Value) -> bool {
    match edge.source_handle.as_deref() {
        Some(TRUE_HANDLE) => branch_outcome(output),
        Some(FALSE_HANDLE) => !branch_outcome(output),
        _ => true,
    }
}

/// Derive the branch boolean from a node output. Missing or non-boolean
/// values resolve to false, so ill-formed conditions take the false path
/// instead of stalling the graph.
fn branch_outcome(output: &Value) -> bool {
    output
        .get(CONDITION_RESULT_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
