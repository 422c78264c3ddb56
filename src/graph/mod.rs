//! Graph model: nodes, edges, and structural validation.

mod types;
mod validator;

pub use types::{
    Edge, Graph, Node, LOOP_BODY_HANDLE, LOOP_BODY_HANDLE_ALIAS, LOOP_NODE_TYPE, TRIGGER_NODE_TYPE,
};
pub use validator::validate_graph;
