//! Flow node types.
//!
//! Nodes are the vertices of a flow graph. Each node has:
//! - A string ID, unique within the flow
//! - A kind: the single start node, or a regular workflow node
//! - A category deciding its default slots
//! - Display data: label, slots, parameters, status
//!
//! The serialized layout matches what the canvas stores in the flow's
//! persisted graph document.

use crate::param::ParamValue;
use crate::slot::{InputSlot, OutputSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

/// ID of the start node in every flow.
pub const START_NODE_ID: &str = "start-node";

/// Identifier of a node within a flow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh node ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("node-{}", Ulid::new()))
    }

    /// The start node's ID.
    #[must_use]
    pub fn start() -> Self {
        Self(START_NODE_ID.to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether a node is the flow's entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The start node.
    #[serde(rename = "start")]
    Start,
    /// Any other step.
    #[serde(rename = "workflowNode")]
    Workflow,
}

/// The category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    /// Events that begin a flow (form submitted, schedule, new grade).
    Trigger,
    /// Side effects (send email, post announcement).
    Action,
    /// Conditions and branching.
    Logic,
    /// Data lookups (roster, gradebook).
    Data,
    /// Reshaping data between steps.
    Transform,
    /// The start node.
    Start,
}

/// Execution status shown on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Configured,
    Running,
    Success,
    Error,
}

/// Canvas position. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Display data carried by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Label shown on the canvas.
    pub label: String,
    /// Node category.
    pub category: NodeCategory,
    /// Declared input slots.
    #[serde(default)]
    pub inputs: Vec<InputSlot>,
    /// Declared output slots.
    #[serde(default)]
    pub outputs: Vec<OutputSlot>,
    /// Parameter map.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    /// Whether the user finished configuring the node.
    #[serde(default)]
    pub configured: bool,
    /// Last known execution status.
    #[serde(default)]
    pub status: NodeStatus,
    /// Start node only: whether the flow has a first step.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_connection: bool,
}

/// A flow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the flow.
    pub id: NodeId,
    /// Start or workflow node.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
    /// Display data.
    pub data: NodeData,
}

impl Node {
    /// Creates a workflow node with a generated ID and default slots.
    #[must_use]
    pub fn new(category: NodeCategory, label: impl Into<String>) -> Self {
        Self::with_id(NodeId::generate(), category, label)
    }

    /// Creates a workflow node with a specific ID.
    #[must_use]
    pub fn with_id(id: NodeId, category: NodeCategory, label: impl Into<String>) -> Self {
        let (inputs, outputs) = Self::default_slots(category);
        let kind = if category == NodeCategory::Start {
            NodeKind::Start
        } else {
            NodeKind::Workflow
        };
        Self {
            id,
            kind,
            position: Position::default(),
            data: NodeData {
                label: label.into(),
                category,
                inputs,
                outputs,
                parameters: BTreeMap::new(),
                configured: false,
                status: NodeStatus::Idle,
                has_connection: false,
            },
        }
    }

    /// Creates the start node.
    #[must_use]
    pub fn start() -> Self {
        Self::with_id(NodeId::start(), NodeCategory::Start, "Start").at(250.0, 50.0)
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Sets a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.data.parameters.insert(key.into(), value);
        self
    }

    /// Marks the node as configured.
    #[must_use]
    pub fn configured(mut self) -> Self {
        self.data.configured = true;
        self.data.status = NodeStatus::Configured;
        self
    }

    /// Returns true for the start node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.kind == NodeKind::Start
    }

    /// Returns the category of this node.
    #[must_use]
    pub fn category(&self) -> NodeCategory {
        self.data.category
    }

    /// Returns the input slot with the given ID, if any.
    #[must_use]
    pub fn input_slot(&self, id: &str) -> Option<&InputSlot> {
        self.data.inputs.iter().find(|s| s.id == id)
    }

    /// Returns the output slot with the given ID, if any.
    #[must_use]
    pub fn output_slot(&self, id: &str) -> Option<&OutputSlot> {
        self.data.outputs.iter().find(|s| s.id == id)
    }

    /// Status a node returns to when no execution is shown on it.
    #[must_use]
    pub fn resting_status(&self) -> NodeStatus {
        if self.data.configured {
            NodeStatus::Configured
        } else {
            NodeStatus::Idle
        }
    }

    /// Default slots by category.
    fn default_slots(category: NodeCategory) -> (Vec<InputSlot>, Vec<OutputSlot>) {
        match category {
            NodeCategory::Start => (vec![], vec![OutputSlot::new("output", "Output")]),
            NodeCategory::Trigger => (
                vec![InputSlot::optional("input", "Input")],
                vec![OutputSlot::new("output", "Output")],
            ),
            NodeCategory::Logic => (
                vec![InputSlot::required("input", "Input")],
                vec![
                    OutputSlot::new("true", "True"),
                    OutputSlot::new("false", "False"),
                ],
            ),
            NodeCategory::Action | NodeCategory::Data | NodeCategory::Transform => (
                vec![InputSlot::required("input", "Input")],
                vec![OutputSlot::new("output", "Output")],
            ),
        }
    }
}
