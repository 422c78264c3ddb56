//! Node executors.
//!
//! Executors implement each node type's actual behavior. The engine only
//! sees the [`Executor`] contract; the built-in set here covers the
//! control-flow nodes (branch, loop) plus a few workhorses that exercise the
//! contract, including one long-running network executor.

mod branch;
mod debug;
mod http;
mod loop_node;
mod registry;
mod set;
mod trigger;
mod types;
mod wait;

pub use branch::BranchExecutor;
pub use debug::DebugExecutor;
pub use http::HttpExecutor;
pub use loop_node::LoopExecutor;
pub use registry::ExecutorRegistry;
pub use set::SetExecutor;
pub use trigger::TriggerExecutor;
pub use types::{Dispatch, ExecutionContext, Executor};
pub use wait::WaitExecutor;
