//! Trigger executor - seeds a run with its configured payload.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::types::{ExecutionContext, Executor};
use crate::error::{Error, Result};

/// Manual trigger executor.
///
/// Trigger nodes mark entry points; this executor gives them a deterministic
/// output: the `payload` configured on the node, falling back to whatever
/// input the run was seeded with.
pub struct TriggerExecutor;

impl TriggerExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TriggerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TriggerConfig {
    #[serde(default)]
    payload: Option<Value>,
}

#[async_trait]
impl Executor for TriggerExecutor {
    fn node_type(&self) -> &str {
        "trigger"
    }

    fn description(&self) -> &str {
        "Entry point emitting its configured payload"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let config: TriggerConfig = serde_json::from_value(ctx.data().clone())
            .map_err(|e| Error::Node(format!("Invalid trigger config: {}", e)))?;

        Ok(config.payload.unwrap_or_else(|| ctx.input.clone()))
    }
}
