//! Node parameter values.
//!
//! A parameter is either a plain JSON value (number, flag, free-form
//! object) or a bound value: literal text, a reference to another node's
//! output field, or a loop over an array field of another node. Bound
//! values are resolved by the runner service; the editor only stores and
//! forwards them.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A parameter value as stored in a node's parameter map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Literal text or an upstream reference.
    Bound(BoundValue),
    /// Any other JSON value, kept verbatim.
    Plain(JsonValue),
}

/// A tagged parameter value.
///
/// Keys the editor does not know (display hints added by the canvas, for
/// example) are carried in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BoundValue {
    /// Text typed by the user.
    Literal {
        value: String,
        #[serde(flatten)]
        extra: Map<String, JsonValue>,
    },
    /// A single field of another node's output.
    Reference {
        node_id: NodeId,
        field: String,
        #[serde(flatten)]
        extra: Map<String, JsonValue>,
    },
    /// An array field of another node's output, iterated item by item.
    Loop {
        node_id: NodeId,
        field: String,
        #[serde(flatten)]
        extra: Map<String, JsonValue>,
    },
}

impl ParamValue {
    /// Literal text.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Bound(BoundValue::Literal {
            value: value.into(),
            extra: Map::new(),
        })
    }

    /// Reference to `field` on the output of `node_id`.
    #[must_use]
    pub fn reference(node_id: NodeId, field: impl Into<String>) -> Self {
        Self::Bound(BoundValue::Reference {
            node_id,
            field: field.into(),
            extra: Map::new(),
        })
    }

    /// Loop over the array `field` on the output of `node_id`.
    #[must_use]
    pub fn loop_over(node_id: NodeId, field: impl Into<String>) -> Self {
        Self::Bound(BoundValue::Loop {
            node_id,
            field: field.into(),
            extra: Map::new(),
        })
    }

    /// Returns the node this value reads from, if any.
    #[must_use]
    pub fn referenced_node(&self) -> Option<&NodeId> {
        match self {
            Self::Bound(BoundValue::Reference { node_id, .. })
            | Self::Bound(BoundValue::Loop { node_id, .. }) => Some(node_id),
            Self::Bound(BoundValue::Literal { .. }) | Self::Plain(_) => None,
        }
    }

    /// Returns true for loop references.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        matches!(self, Self::Bound(BoundValue::Loop { .. }))
    }
}

impl From<JsonValue> for ParamValue {
    fn from(value: JsonValue) -> Self {
        Self::Plain(value)
    }
}
