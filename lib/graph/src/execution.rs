//! Execution events pushed by the node runner.
//!
//! The runner streams JSON messages shaped as
//! `{"event": "node:started", "data": {...}}`. Applying an event to a graph
//! only touches node statuses, so the result is never persisted.

use crate::graph::GraphState;
use crate::node::{NodeId, NodeStatus};
use classflow_core::ExecutionId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

/// A message from the execution event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ExecutionEvent {
    #[serde(rename = "execution:started")]
    ExecutionStarted { execution_id: ExecutionId },

    #[serde(rename = "node:started")]
    NodeStarted {
        execution_id: ExecutionId,
        node_id: NodeId,
    },

    #[serde(rename = "node:completed")]
    NodeCompleted {
        execution_id: ExecutionId,
        node_id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<JsonValue>,
    },

    #[serde(rename = "node:failed")]
    NodeFailed {
        execution_id: ExecutionId,
        node_id: NodeId,
        error: String,
    },

    #[serde(rename = "log")]
    Log {
        execution_id: ExecutionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
        message: String,
    },

    #[serde(rename = "execution:completed")]
    ExecutionCompleted { execution_id: ExecutionId },

    #[serde(rename = "execution:failed")]
    ExecutionFailed {
        execution_id: ExecutionId,
        error: String,
    },
}

impl ExecutionEvent {
    /// The execution this event belongs to.
    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        match self {
            Self::ExecutionStarted { execution_id }
            | Self::NodeStarted { execution_id, .. }
            | Self::NodeCompleted { execution_id, .. }
            | Self::NodeFailed { execution_id, .. }
            | Self::Log { execution_id, .. }
            | Self::ExecutionCompleted { execution_id }
            | Self::ExecutionFailed { execution_id, .. } => execution_id,
        }
    }

    /// The node this event is about, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::NodeStarted { node_id, .. }
            | Self::NodeCompleted { node_id, .. }
            | Self::NodeFailed { node_id, .. } => Some(node_id),
            Self::Log { node_id, .. } => node_id.as_ref(),
            _ => None,
        }
    }

    /// Whether no further events follow for this execution.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionCompleted { .. } | Self::ExecutionFailed { .. }
        )
    }

    /// Updates node statuses on `graph` to reflect this event.
    ///
    /// Events naming nodes that are not in the graph are ignored.
    pub(crate) fn apply_to(&self, graph: &mut GraphState) {
        match self {
            Self::ExecutionStarted { .. } => {
                for node in graph.nodes_mut().filter(|n| !n.is_start()) {
                    node.data.status = node.resting_status();
                }
            }
            Self::NodeStarted { node_id, .. } => set_status(graph, node_id, NodeStatus::Running),
            Self::NodeCompleted { node_id, .. } => set_status(graph, node_id, NodeStatus::Success),
            Self::NodeFailed { node_id, .. } => set_status(graph, node_id, NodeStatus::Error),
            Self::ExecutionFailed { .. } => {
                for node in graph
                    .nodes_mut()
                    .filter(|n| n.data.status == NodeStatus::Running)
                {
                    node.data.status = NodeStatus::Error;
                }
            }
            Self::Log { .. } | Self::ExecutionCompleted { .. } => {}
        }
    }
}

fn set_status(graph: &mut GraphState, node_id: &NodeId, status: NodeStatus) {
    match graph.node_mut(node_id) {
        Some(node) => node.data.status = status,
        None => debug!(%node_id, "execution event for unknown node"),
    }
}
