//! Graph validation.

use std::collections::HashSet;

use super::types::Graph;
use crate::error::{Error, Result};

/// Validate a graph before a run.
///
/// Checks for:
/// - At least one node, at least one trigger node
/// - Non-empty, unique node IDs
/// - Non-empty node types
/// - Unique edge IDs
/// - Edge endpoints that reference existing nodes
///
/// Structural problems are fatal: the run is rejected before any node runs.
pub fn validate_graph(graph: &Graph) -> Result<()> {
    if graph.nodes.is_empty() {
        return Err(Error::Validation("Graph must have at least one node".into()));
    }

    let mut ids = HashSet::new();
    for node in &graph.nodes {
        if node.id.is_empty() {
            return Err(Error::Validation("Node ID cannot be empty".into()));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(Error::Validation(format!("Duplicate node ID: {}", node.id)));
        }
        if node.node_type.is_empty() {
            return Err(Error::Validation(format!("Node '{}' has empty type", node.id)));
        }
    }

    let mut edge_ids = HashSet::new();
    for edge in &graph.edges {
        if edge.id.is_empty() {
            return Err(Error::Validation("Edge ID cannot be empty".into()));
        }
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(Error::Validation(format!("Duplicate edge ID: {}", edge.id)));
        }
        if !ids.contains(edge.source.as_str()) {
            return Err(Error::Validation(format!(
                "Edge '{}' references non-existent source node '{}'",
                edge.id, edge.source
            )));
        }
        if !ids.contains(edge.target.as_str()) {
            return Err(Error::Validation(format!(
                "Edge '{}' references non-existent target node '{}'",
                edge.id, edge.target
            )));
        }
    }

    if graph.trigger_nodes().is_empty() {
        return Err(Error::Validation("Graph has no trigger node".into()));
    }

    Ok(())
}
