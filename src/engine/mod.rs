//! Execution engine: per-run state, traversal, and run controls.

mod cancel;
mod dispatcher;
mod runner;
mod state;

pub use cancel::CancelSignal;
pub use dispatcher::{Dispatcher, CONDITION_RESULT_KEY};
pub use runner::{RunSummary, Runner};
pub use state::{LogEntry, LogKind, NodeState, NodeStatus, RunContext};
