//! Executor registry - manages available node types.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::Executor;
use super::{
    BranchExecutor, DebugExecutor, HttpExecutor, LoopExecutor, SetExecutor, TriggerExecutor,
    WaitExecutor,
};

/// Registry of available executors, keyed by node type.
///
/// A node type with no registered executor is not an error: the dispatcher
/// treats it as the identity function and passes the input through.
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    /// Create a registry with the built-in executors.
    pub fn new() -> Self {
        let mut registry = Self {
            executors: HashMap::new(),
        };

        registry.register(Arc::new(TriggerExecutor::new()));
        registry.register(Arc::new(BranchExecutor::new()));
        registry.register(Arc::new(LoopExecutor::new()));
        registry.register(Arc::new(SetExecutor::new()));
        registry.register(Arc::new(WaitExecutor::new()));
        registry.register(Arc::new(HttpExecutor::new()));
        registry.register(Arc::new(DebugExecutor::new()));

        registry
    }

    /// Create an empty registry (for testing).
    pub fn empty() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor.
    pub fn register(&mut self, executor: Arc<dyn Executor>) {
        self.executors
            .insert(executor.node_type().to_string(), executor);
    }

    /// Get an executor by node type.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(node_type).cloned()
    }

    /// Check if a node type is registered.
    pub fn has(&self, node_type: &str) -> bool {
        self.executors.contains_key(node_type)
    }

    /// List all registered node types.
    pub fn list(&self) -> Vec<&str> {
        self.executors.keys().map(|s| s.as_str()).collect()
    }

    /// Get descriptions of all registered executors.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        self.executors
            .iter()
            .map(|(name, executor)| (name.as_str(), executor.description()))
            .collect()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
