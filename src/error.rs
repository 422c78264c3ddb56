//! Error types for weft.

use thiserror::Error;

/// Result type alias for weft operations.
pub type Result<T> = std::result::Result<T, Error>;

/// weft error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed graph: rejected before any node runs.
    #[error("Graph validation error: {0}")]
    Validation(String),

    /// A node executor failed. Recovered locally: the failing branch stops,
    /// sibling branches keep running.
    #[error("Node error: {0}")]
    Node(String),

    /// Run-level misuse (e.g. starting a run while one is active).
    #[error("Execution error: {0}")]
    Execution(String),

    /// The run's cancel signal was observed. Distinct from a node failure so
    /// a stopped run is not reported as a failed one.
    #[error("Execution cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable code for each variant.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Node(_) => "NODE_ERROR",
            Error::Execution(_) => "EXECUTION_ERROR",
            Error::Cancelled => "CANCELLED",
            Error::Json(_) => "JSON_ERROR",
        }
    }

    /// True when this error is the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
