//! Debug executor - log and inspect data mid-run.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::types::{ExecutionContext, Executor};
use crate::engine::LogKind;
use crate::error::{Error, Result};

/// Debug executor: writes a labeled entry to the execution log and passes
/// its input through unchanged.
pub struct DebugExecutor;

impl DebugExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DebugExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct DebugConfig {
    /// Label for this debug point
    #[serde(default)]
    label: Option<String>,

    /// Custom message to log
    #[serde(default)]
    message: Option<String>,

    /// Whether to include the full input in the log entry
    #[serde(default = "default_true")]
    log_input: bool,
}

fn default_true() -> bool {
    true
}

#[async_trait]
impl Executor for DebugExecutor {
    fn node_type(&self) -> &str {
        "debug"
    }

    fn description(&self) -> &str {
        "Log and inspect data flowing through this point"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let config: DebugConfig = serde_json::from_value(ctx.data().clone())
            .map_err(|e| Error::Node(format!("Invalid debug config: {}", e)))?;

        let label = config.label.as_deref().unwrap_or("debug");
        let mut parts = vec![format!("[{}]", label)];
        if let Some(message) = &config.message {
            parts.push(message.clone());
        }
        if config.log_input {
            parts.push(format!("input={}", ctx.input));
        }

        ctx.add_log(LogKind::Info, parts.join(" "));

        Ok(ctx.input.clone())
    }
}
