//! Error types for the graph crate.
//!
//! - `ConnectionRejection`: why a proposed edge was refused
//! - `ActionRejected`: why a reducer action left the graph unchanged
//! - `GraphError`: parsing and serializing persisted graphs

use crate::edge::EdgeId;
use crate::node::NodeId;
use serde::Serialize;
use std::fmt;

/// Reasons the connection rules refuse an edge, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConnectionRejection {
    /// The target is the start node.
    StartNodeInput,
    /// The target already has an inbound edge.
    TargetAlreadyConnected { target: NodeId },
    /// The source or target is not in the graph.
    DanglingEndpoint { node_id: NodeId },
    /// Source and target are the same node.
    SelfConnection { node_id: NodeId },
    /// An edge already joins this source and target.
    DuplicateConnection { source: NodeId, target: NodeId },
}

impl ConnectionRejection {
    /// Message shown to the user in a transient notice.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::StartNodeInput => "The Start node cannot receive input.",
            Self::TargetAlreadyConnected { .. } => {
                "This node already has an input connection."
            }
            Self::DanglingEndpoint { .. } => "That node no longer exists.",
            Self::SelfConnection { .. } => "A node cannot connect to itself.",
            Self::DuplicateConnection { .. } => "These nodes are already connected.",
        }
    }
}

impl fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartNodeInput => write!(f, "start node cannot receive input"),
            Self::TargetAlreadyConnected { target } => {
                write!(f, "node {target} already has an input connection")
            }
            Self::DanglingEndpoint { node_id } => {
                write!(f, "dangling endpoint: node {node_id} not found")
            }
            Self::SelfConnection { node_id } => {
                write!(f, "self-connection not allowed on node {node_id}")
            }
            Self::DuplicateConnection { source, target } => {
                write!(f, "duplicate connection: {source} -> {target}")
            }
        }
    }
}

impl std::error::Error for ConnectionRejection {}

/// Reasons a reducer action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRejected {
    /// The connection rules refused the edge.
    Connection(ConnectionRejection),
    /// A node with this ID already exists.
    DuplicateNode { node_id: NodeId },
    /// The flow already has a start node.
    SecondStartNode,
    /// The node is not in the graph.
    NodeNotFound { node_id: NodeId },
    /// The edge is not in the graph.
    EdgeNotFound { edge_id: EdgeId },
}

impl ActionRejected {
    /// Message shown to the user in a transient notice.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Connection(rejection) => rejection.user_message(),
            Self::DuplicateNode { .. } => "A node with that ID already exists.",
            Self::SecondStartNode => "A flow can only have one Start node.",
            Self::NodeNotFound { .. } => "That node no longer exists.",
            Self::EdgeNotFound { .. } => "That connection no longer exists.",
        }
    }
}

impl fmt::Display for ActionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(rejection) => write!(f, "connection rejected: {rejection}"),
            Self::DuplicateNode { node_id } => write!(f, "node {node_id} already exists"),
            Self::SecondStartNode => write!(f, "flow already has a start node"),
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
        }
    }
}

impl std::error::Error for ActionRejected {}

impl From<ConnectionRejection> for ActionRejected {
    fn from(rejection: ConnectionRejection) -> Self {
        Self::Connection(rejection)
    }
}

/// Errors from reading or writing persisted graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The persisted document is not a valid graph.
    Parse { reason: String },
    /// The graph could not be serialized.
    Serialize { reason: String },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { reason } => write!(f, "failed to parse flow graph: {reason}"),
            Self::Serialize { reason } => {
                write!(f, "failed to serialize flow graph: {reason}")
            }
        }
    }
}

impl std::error::Error for GraphError {}
