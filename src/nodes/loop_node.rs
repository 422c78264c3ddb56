//! Loop executor - re-invokes a downstream subgraph per array item.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::types::{ExecutionContext, Executor};
use crate::engine::NodeState;
use crate::error::{Error, Result};

/// Loop executor.
///
/// The node's input must be an array. For each item, in input order, the
/// executor re-enters the engine through the injected dispatcher to run the
/// body subgraph (the edge tagged `sourceHandle: "loop"`, or the single
/// outgoing edge), then reads the body chain's tail status from the snapshot
/// and collects its output. The accumulator, in input order, becomes the
/// loop node's own output, which the dispatcher forwards along the
/// continuation edges afterwards.
///
/// Iterations are strictly sequential. Cancellation is checked before every
/// item and aborts the whole loop; a failed iteration aborts it too.
pub struct LoopExecutor;

impl LoopExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoopExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct LoopConfig {
    /// Dotted path into the tail output to collect per item. Collects the
    /// whole output when unset.
    #[serde(default)]
    collect: Option<String>,
}

#[async_trait]
impl Executor for LoopExecutor {
    fn node_type(&self) -> &str {
        "loop"
    }

    fn description(&self) -> &str {
        "Run the body subgraph once per input array item, collecting results in order"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let config: LoopConfig = serde_json::from_value(ctx.data().clone())
            .map_err(|e| Error::Node(format!("Invalid loop config: {}", e)))?;

        let items = ctx
            .input
            .as_array()
            .ok_or_else(|| Error::Node("Loop input must be an array".to_string()))?;

        let max_items = ctx.run.settings().max_loop_items;
        if items.len() > max_items {
            return Err(Error::Node(format!(
                "Loop has {} items, exceeding limit of {}",
                items.len(),
                max_items
            )));
        }

        let body_edge = ctx.graph.loop_body_edge(&ctx.node.id).ok_or_else(|| {
            Error::Node(format!(
                "Loop node '{}' has no unambiguous body edge",
                ctx.node.id
            ))
        })?;
        let body_target = body_edge.target.clone();
        let tail_id = ctx.graph.chain_tail(&body_target).to_string();

        debug!(
            "Loop '{}' iterating {} items through body '{}' (tail '{}')",
            ctx.node.id,
            items.len(),
            body_target,
            tail_id
        );

        let mut collected = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }

            // Runs the body entry and, through edge-following, every further
            // successor in the body subgraph.
            ctx.dispatcher.dispatch(&body_target, item.clone()).await?;

            let tail_status = ctx.run.status_of(&tail_id).ok_or_else(|| {
                Error::Node(format!("Loop body tail '{}' not found in run state", tail_id))
            })?;

            if tail_status.state == NodeState::Error {
                return Err(Error::Node(format!(
                    "Loop iteration {} failed at '{}': {}",
                    index,
                    tail_id,
                    tail_status.error.as_deref().unwrap_or("unknown error")
                )));
            }

            collected.push(collect_value(&tail_status.output, config.collect.as_deref()));
        }

        Ok(Value::Array(collected))
    }
}

/// Pluck the collected value from a tail output: the whole output, or the
/// configured dotted path into it (`null` when the path is absent).
fn collect_value(output: &Value, collect: Option<&str>) -> Value {
    let Some(path) = collect else {
        return output.clone();
    };

    let mut current = output;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return Value::Null,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => current = next,
                None => return Value::Null,
            },
            _ => return Value::Null,
        }
    }
    current.clone()
}
