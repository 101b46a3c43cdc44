//! Flow activity.
//!
//! A flow is active when the start node has at least one outbound edge.
//! The target of the first such edge, in insertion order, is the flow's
//! first node.

use crate::edge::Edge;
use crate::node::{Node, NodeId, NodeStatus};
use serde::{Deserialize, Serialize};

/// Whether the flow can run, and where it begins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowActivity {
    pub is_active: bool,
    pub first_node_id: Option<NodeId>,
}

/// Derives the flow's activity from its edges.
#[must_use]
pub fn derive_activity(edges: &[Edge], start_id: &NodeId) -> FlowActivity {
    let first_node_id = edges
        .iter()
        .find(|e| &e.source == start_id)
        .map(|e| e.target.clone());
    FlowActivity {
        is_active: first_node_id.is_some(),
        first_node_id,
    }
}

/// Every node the start node connects to, in insertion order.
///
/// The start node may fan out; [`derive_activity`] reports only the first.
#[must_use]
pub fn first_nodes<'a>(edges: &'a [Edge], start_id: &NodeId) -> Vec<&'a NodeId> {
    edges
        .iter()
        .filter(|e| &e.source == start_id)
        .map(|e| &e.target)
        .collect()
}

/// Writes the activity onto the start node's display data.
pub fn mark_start(start: &mut Node, activity: &FlowActivity) {
    start.data.has_connection = activity.is_active;
    start.data.status = if activity.is_active {
        NodeStatus::Configured
    } else {
        NodeStatus::Idle
    };
}
