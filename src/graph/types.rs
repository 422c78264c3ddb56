//! Graph type definitions.
//!
//! A [`Graph`] is the read-only snapshot of the canvas the editor produced:
//! nodes carry a type string and executor-specific `data`, edges connect them
//! and may carry a named `sourceHandle` used for branch filtering and loop
//! body designation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Node type string for loop nodes, whose downstream dispatch is driven by
/// their own executor rather than by generic edge-following.
pub const LOOP_NODE_TYPE: &str = "loop";

/// Node type string marking an entry point.
pub const TRIGGER_NODE_TYPE: &str = "trigger";

/// Source handle designating a loop node's body edge.
pub const LOOP_BODY_HANDLE: &str = "loop";

/// Alias handle for a loop node's body edge.
pub const LOOP_BODY_HANDLE_ALIAS: &str = "body";

/// A node placed on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID within the graph.
    pub id: String,

    /// Node type (trigger, if, loop, http, ...). Resolved against the
    /// executor registry at dispatch time.
    #[serde(rename = "type")]
    pub node_type: String,

    /// Executor-specific configuration (a condition, a URL, a duration).
    #[serde(default)]
    pub data: Value,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID within the graph.
    pub id: String,

    /// Source node ID.
    pub source: String,

    /// Target node ID.
    pub target: String,

    /// Named output of the source node ("true"/"false" on a branch node,
    /// "loop" on a loop node's body). Absent means the unconditional default
    /// output.
    #[serde(default, rename = "sourceHandle", skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,

    /// Named input of the target node. Carried for round-tripping; the
    /// engine does not dispatch on it.
    #[serde(default, rename = "targetHandle", skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// True when this edge designates a loop node's iteration body.
    pub fn is_loop_body(&self) -> bool {
        matches!(
            self.source_handle.as_deref(),
            Some(LOOP_BODY_HANDLE) | Some(LOOP_BODY_HANDLE_ALIAS)
        )
    }
}

/// A complete workflow graph, immutable for the duration of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Get a node by ID.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All edges leaving `node_id`, in graph order.
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == node_id).collect()
    }

    /// Trigger nodes, in graph order. The declared marker (type string or
    /// `data.category`) is authoritative; in-degree is not consulted, so a
    /// trigger may legally have incoming edges.
    pub fn trigger_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| Self::is_trigger(n)).collect()
    }

    /// Whether a node is a declared entry point.
    pub fn is_trigger(node: &Node) -> bool {
        node.node_type == TRIGGER_NODE_TYPE
            || node
                .data
                .get("category")
                .and_then(Value::as_str)
                .map(|c| c == TRIGGER_NODE_TYPE)
                .unwrap_or(false)
    }

    /// The edge designating a loop node's iteration body: the outgoing edge
    /// tagged with the body handle, or the single outgoing edge when no
    /// tagged edge exists.
    pub fn loop_body_edge(&self, node_id: &str) -> Option<&Edge> {
        let outgoing = self.outgoing_edges(node_id);
        if let Some(tagged) = outgoing.iter().find(|e| e.is_loop_body()) {
            return Some(tagged);
        }
        if outgoing.len() == 1 {
            return Some(outgoing[0]);
        }
        None
    }

    /// Walk first outgoing edges from `start` until a node with no outgoing
    /// edge, returning that tail node's ID. Cycle-guarded: revisiting a node
    /// ends the walk at the last fresh node.
    pub fn chain_tail<'a>(&'a self, start: &'a str) -> &'a str {
        let mut visited = HashSet::new();
        let mut current = start;
        visited.insert(current);
        while let Some(edge) = self.edges.iter().find(|e| e.source == current) {
            if !visited.insert(edge.target.as_str()) {
                break;
            }
            current = edge.target.as_str();
        }
        current
    }

    /// All node types used in this graph, sorted and deduplicated.
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.nodes.iter().map(|n| n.node_type.as_str()).collect();
        types.sort();
        types.dedup();
        types
    }
}
