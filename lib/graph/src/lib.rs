//! Flow graph editor state for classflow.
//!
//! This crate provides the in-memory model of an open flow, including:
//!
//! - **Graph Model**: Ordered nodes and edges with a single protected start node
//! - **Connection Rules**: Pure accept/reject decisions for proposed edges
//! - **Activity**: Whether a flow is active and which node runs first
//! - **Reducer**: Every canvas mutation as a pure state transition
//! - **Templates**: Built-in flows and the ID-remapping applier
//! - **Execution Events**: Runner messages mapped onto node statuses

pub mod activity;
pub mod edge;
pub mod error;
pub mod execution;
pub mod graph;
pub mod node;
pub mod param;
pub mod reducer;
pub mod slot;
pub mod template;
pub mod validate;

#[cfg(test)]
mod testing;

pub use activity::{FlowActivity, derive_activity};
pub use edge::{Branch, Edge, EdgeId, ProposedEdge};
pub use error::{ActionRejected, ConnectionRejection, GraphError};
pub use execution::ExecutionEvent;
pub use graph::{DanglingReference, GraphAnalysis, GraphState, Repair};
pub use node::{Node, NodeCategory, NodeData, NodeId, NodeKind, NodeStatus, Position, START_NODE_ID};
pub use param::{BoundValue, ParamValue};
pub use reducer::{GraphAction, reduce};
pub use slot::{DataType, InputSlot, OutputSlot};
pub use template::{Template, TemplateGraph, apply_template};
pub use validate::{validate_connection, validate_live};
