//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunable limits for a [`Runner`](crate::engine::Runner).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum number of items a loop node may iterate over.
    /// Prevents memory exhaustion from unboundedly large arrays.
    #[serde(default = "default_max_loop_items")]
    pub max_loop_items: usize,

    /// Maximum number of entries retained in the execution log.
    /// The oldest entries are dropped once the cap is reached.
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_loop_items: default_max_loop_items(),
            max_log_entries: default_max_log_entries(),
        }
    }
}

fn default_max_loop_items() -> usize {
    10_000
}

fn default_max_log_entries() -> usize {
    10_000
}
