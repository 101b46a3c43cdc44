//! Edge types for flow graphs.
//!
//! An edge connects one node's output slot to another node's input slot.
//! [`ProposedEdge`] is a connection the user is drawing; it becomes an
//! [`Edge`] once the connection rules accept it.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier of an edge within a flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Creates an edge ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh edge ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("edge-{}", Ulid::new()))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Branch taken by an edge leaving a conditional node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    True,
    False,
}

impl Branch {
    /// Maps a conditional node's output slot to its branch.
    #[must_use]
    pub fn from_slot(slot: &str) -> Option<Self> {
        match slot {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            _ => None,
        }
    }
}

/// A materialized edge in a flow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identifier within the flow.
    pub id: EdgeId,
    /// Source node.
    pub source: NodeId,
    /// Output slot on the source node.
    #[serde(default = "default_source_handle")]
    pub source_handle: String,
    /// Target node.
    pub target: NodeId,
    /// Input slot on the target node.
    #[serde(default = "default_target_handle")]
    pub target_handle: String,
    /// Branch tag for edges leaving a conditional node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
}

fn default_source_handle() -> String {
    "output".to_string()
}

fn default_target_handle() -> String {
    "input".to_string()
}

impl Edge {
    /// Returns the connection this edge represents.
    #[must_use]
    pub fn as_proposal(&self) -> ProposedEdge {
        ProposedEdge {
            source: self.source.clone(),
            source_handle: self.source_handle.clone(),
            target: self.target.clone(),
            target_handle: self.target_handle.clone(),
            branch: self.branch,
        }
    }
}

/// A connection that has not been accepted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedEdge {
    /// Source node.
    pub source: NodeId,
    /// Output slot on the source node.
    pub source_handle: String,
    /// Target node.
    pub target: NodeId,
    /// Input slot on the target node.
    pub target_handle: String,
    /// Branch tag, if already known.
    #[serde(default)]
    pub branch: Option<Branch>,
}

impl ProposedEdge {
    /// Proposes a connection using the default slots ("output" -> "input").
    #[must_use]
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            source_handle: default_source_handle(),
            target: target.into(),
            target_handle: default_target_handle(),
            branch: None,
        }
    }

    /// Sets the source and target slots.
    #[must_use]
    pub fn with_handles(
        mut self,
        source_handle: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        self.source_handle = source_handle.into();
        self.target_handle = target_handle.into();
        self
    }

    /// Sets the branch tag.
    #[must_use]
    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branch = Some(branch);
        self
    }

    /// Materializes the proposal under the given edge ID.
    #[must_use]
    pub fn into_edge(self, id: EdgeId) -> Edge {
        Edge {
            id,
            source: self.source,
            source_handle: self.source_handle,
            target: self.target,
            target_handle: self.target_handle,
            branch: self.branch,
        }
    }
}
