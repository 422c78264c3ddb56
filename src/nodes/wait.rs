//! Wait executor - pause a branch for a duration.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::types::{ExecutionContext, Executor};
use crate::error::{Error, Result};

/// Wait executor that pauses its branch.
///
/// The sleep races the run's cancel signal: a stop request interrupts the
/// wait promptly with a cancellation error instead of holding the run open.
pub struct WaitExecutor;

impl WaitExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WaitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WaitConfig {
    /// Duration to wait in seconds (can be fractional, e.g., 0.5 for 500ms)
    #[serde(default)]
    seconds: Option<f64>,

    /// Duration to wait in milliseconds
    #[serde(default)]
    milliseconds: Option<u64>,
}

#[async_trait]
impl Executor for WaitExecutor {
    fn node_type(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "Pause this branch for a specified duration"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let config: WaitConfig = serde_json::from_value(ctx.data().clone())
            .map_err(|e| Error::Node(format!("Invalid wait config: {}", e)))?;

        let wait_ms = calculate_wait_duration(&config)?;

        if wait_ms > 0 {
            info!("Wait node '{}' pausing for {}ms", ctx.node.id, wait_ms);

            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(wait_ms)) => {}
                _ = ctx.run.cancel().cancelled() => return Err(Error::Cancelled),
            }
        }

        // Pass through input unchanged.
        Ok(ctx.input.clone())
    }
}

/// Calculate the wait duration in milliseconds from config.
fn calculate_wait_duration(config: &WaitConfig) -> Result<u64> {
    let mut total_ms: u64 = 0;

    if let Some(seconds) = config.seconds {
        if seconds < 0.0 {
            return Err(Error::Node("Wait duration cannot be negative".to_string()));
        }
        total_ms += (seconds * 1000.0) as u64;
    }

    if let Some(ms) = config.milliseconds {
        total_ms += ms;
    }

    // Cap at 1 hour to prevent accidental long waits
    const MAX_WAIT_MS: u64 = 60 * 60 * 1000;
    if total_ms > MAX_WAIT_MS {
        return Err(Error::Node(format!(
            "Wait duration {}ms exceeds maximum of {}ms (1 hour)",
            total_ms, MAX_WAIT_MS
        )));
    }

    Ok(total_ms)
}
