//! Input and output slots on flow nodes.
//!
//! Slots are the named connection points an edge attaches to. Each slot
//! carries a data-type tag for display, but connections never check tags
//! against each other: every output feeds the generic execution-data
//! channel and any input accepts it.

use serde::{Deserialize, Serialize};

/// Data-type tag shown on a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataType(String);

impl DataType {
    /// The tag used by every built-in slot.
    pub const EXECUTION_DATA: &'static str = "ExecutionData";

    /// Creates a tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The generic execution-data tag.
    #[must_use]
    pub fn execution_data() -> Self {
        Self::new(Self::EXECUTION_DATA)
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DataType {
    fn default() -> Self {
        Self::execution_data()
    }
}

/// An input slot on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSlot {
    /// Slot identifier, used as the edge's target handle.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Data-type tag.
    #[serde(default)]
    pub data_type: DataType,
    /// Whether the node needs this input to run.
    #[serde(default)]
    pub required: bool,
}

impl InputSlot {
    /// Creates a required input slot.
    #[must_use]
    pub fn required(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: DataType::execution_data(),
            required: true,
        }
    }

    /// Creates an optional input slot.
    #[must_use]
    pub fn optional(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: DataType::execution_data(),
            required: false,
        }
    }
}

/// An output slot on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSlot {
    /// Slot identifier, used as the edge's source handle.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Data-type tag.
    #[serde(default)]
    pub data_type: DataType,
}

impl OutputSlot {
    /// Creates an output slot.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: DataType::execution_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_slot_required() {
        let slot = InputSlot::required("input", "Input");
        assert!(slot.required);
        assert_eq!(slot.data_type.as_str(), "ExecutionData");
    }

    #[test]
    fn input_slot_optional() {
        let slot = InputSlot::optional("config", "Config");
        assert!(!slot.required);
    }

    #[test]
    fn missing_data_type_defaults_to_execution_data() {
        let slot: OutputSlot =
            serde_json::from_str(r#"{"id":"out","name":"Out"}"#).expect("deserialize");
        assert_eq!(slot.data_type, DataType::execution_data());
    }

    #[test]
    fn slots_use_camel_case_keys() {
        let json = serde_json::to_value(InputSlot::required("in", "In")).expect("serialize");
        assert!(json.get("dataType").is_some());
    }
}
