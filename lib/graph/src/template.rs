//! Flow templates.
//!
//! Applying a template replaces the whole graph. Template node IDs are
//! made unique with a suffix so a template can be applied to many flows:
//! `start-node` keeps its ID, every other node becomes
//! `{id}-{suffix}-{index}` and every edge `edge-{suffix}-{index}`.

use crate::edge::{Branch, Edge, EdgeId, ProposedEdge};
use crate::graph::GraphState;
use crate::node::{Node, NodeCategory, NodeId, START_NODE_ID};
use crate::param::{BoundValue, ParamValue};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;

/// A predefined flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Catalog key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the flow does.
    pub description: String,
    /// Template nodes, with template-local IDs.
    pub nodes: Vec<Node>,
    /// Template edges between template-local IDs.
    pub edges: Vec<ProposedEdge>,
}

/// Nodes and edges produced by applying a template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl From<TemplateGraph> for GraphState {
    fn from(applied: TemplateGraph) -> Self {
        Self::from_parts(applied.nodes, applied.edges)
    }
}

/// Suffix derived from the current time, in milliseconds.
#[must_use]
pub fn timestamp_suffix() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// Instantiates `template` with fresh IDs.
///
/// Parameter references between template nodes are rewritten along with
/// the edges. Template consistency is not checked: an edge naming a node
/// absent from the template keeps the unknown ID.
#[must_use]
pub fn apply_template(template: &Template, suffix: &str) -> TemplateGraph {
    let mut id_map: HashMap<&NodeId, NodeId> = HashMap::new();
    for (index, node) in template.nodes.iter().enumerate() {
        let new_id = if node.id.as_str() == START_NODE_ID {
            node.id.clone()
        } else {
            NodeId::new(format!("{}-{suffix}-{index}", node.id))
        };
        id_map.insert(&node.id, new_id);
    }

    let remap = |id: &NodeId| -> NodeId {
        match id_map.get(id) {
            Some(mapped) => mapped.clone(),
            None => {
                warn!(template = %template.id, node_id = %id, "template refers to unknown node");
                id.clone()
            }
        }
    };

    let nodes = template
        .nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            node.id = remap(&node.id);
            for value in node.data.parameters.values_mut() {
                if let ParamValue::Bound(
                    BoundValue::Reference { node_id, .. } | BoundValue::Loop { node_id, .. },
                ) = value
                    && let Some(mapped) = id_map.get(&*node_id)
                {
                    *node_id = mapped.clone();
                }
            }
            node
        })
        .collect();

    let edges = template
        .edges
        .iter()
        .enumerate()
        .map(|(index, proposal)| {
            let mut proposal = proposal.clone();
            proposal.source = remap(&proposal.source);
            proposal.target = remap(&proposal.target);
            proposal.into_edge(EdgeId::new(format!("edge-{suffix}-{index}")))
        })
        .collect();

    TemplateGraph { nodes, edges }
}

/// Returns the built-in template catalog.
#[must_use]
pub fn catalog() -> Vec<Template> {
    vec![grade_alert(), attendance_digest(), student_welcome()]
}

/// Finds a built-in template by its catalog key.
#[must_use]
pub fn find(id: &str) -> Option<Template> {
    catalog().into_iter().find(|t| t.id == id)
}

fn grade_alert() -> Template {
    let trigger = NodeId::from("grade-posted");
    Template {
        id: "grade-alert".to_string(),
        name: "Low Grade Alert".to_string(),
        description: "Email a parent when a posted grade falls below a threshold.".to_string(),
        nodes: vec![
            Node::start(),
            Node::with_id(trigger.clone(), NodeCategory::Trigger, "New Grade Posted")
                .at(250.0, 170.0)
                .configured(),
            Node::with_id("below-threshold".into(), NodeCategory::Logic, "Score below 60?")
                .at(250.0, 290.0)
                .with_parameter("value", ParamValue::reference(trigger.clone(), "score"))
                .with_parameter("operator", json!("lessThan").into())
                .with_parameter("threshold", json!(60).into())
                .configured(),
            Node::with_id("email-parent".into(), NodeCategory::Action, "Email Parent")
                .at(100.0, 420.0)
                .with_parameter("to", ParamValue::reference(trigger.clone(), "parentEmail"))
                .with_parameter("subject", ParamValue::literal("Grade update")),
            Node::with_id("log-grade".into(), NodeCategory::Action, "Log Grade")
                .at(400.0, 420.0)
                .with_parameter("sheet", ParamValue::literal("Gradebook")),
        ],
        edges: vec![
            ProposedEdge::new(START_NODE_ID, "grade-posted"),
            ProposedEdge::new("grade-posted", "below-threshold"),
            ProposedEdge::new("below-threshold", "email-parent")
                .with_handles("true", "input")
                .with_branch(Branch::True),
            ProposedEdge::new("below-threshold", "log-grade")
                .with_handles("false", "input")
                .with_branch(Branch::False),
        ],
    }
}

fn attendance_digest() -> Template {
    let fetch = NodeId::from("fetch-attendance");
    let summarize = NodeId::from("summarize-absences");
    Template {
        id: "attendance-digest".to_string(),
        name: "Weekly Attendance Digest".to_string(),
        description: "Summarize the week's absences and email them every Friday.".to_string(),
        nodes: vec![
            Node::start(),
            Node::with_id("every-friday".into(), NodeCategory::Trigger, "Every Friday 3pm")
                .at(250.0, 170.0)
                .with_parameter("cron", json!("0 15 * * 5").into())
                .configured(),
            Node::with_id(fetch.clone(), NodeCategory::Data, "Fetch Attendance")
                .at(250.0, 290.0)
                .with_parameter("range", ParamValue::literal("this-week")),
            Node::with_id(summarize.clone(), NodeCategory::Transform, "Summarize Absences")
                .at(250.0, 410.0)
                .with_parameter("records", ParamValue::loop_over(fetch, "records")),
            Node::with_id("email-digest".into(), NodeCategory::Action, "Email Digest")
                .at(250.0, 530.0)
                .with_parameter("body", ParamValue::reference(summarize, "summary")),
        ],
        edges: vec![
            ProposedEdge::new(START_NODE_ID, "every-friday"),
            ProposedEdge::new("every-friday", "fetch-attendance"),
            ProposedEdge::new("fetch-attendance", "summarize-absences"),
            ProposedEdge::new("summarize-absences", "email-digest"),
        ],
    }
}

fn student_welcome() -> Template {
    let enrolled = NodeId::from("student-enrolled");
    Template {
        id: "student-welcome".to_string(),
        name: "New Student Welcome".to_string(),
        description: "Welcome a newly enrolled student and add them to the class roster."
            .to_string(),
        nodes: vec![
            Node::start(),
            Node::with_id(enrolled.clone(), NodeCategory::Trigger, "Student Enrolled")
                .at(250.0, 170.0)
                .configured(),
            Node::with_id("welcome-email".into(), NodeCategory::Action, "Send Welcome Email")
                .at(100.0, 300.0)
                .with_parameter("to", ParamValue::reference(enrolled.clone(), "email"))
                .with_parameter("subject", ParamValue::literal("Welcome to class!")),
            Node::with_id("add-to-roster".into(), NodeCategory::Action, "Add to Roster")
                .at(400.0, 300.0)
                .with_parameter("student", ParamValue::reference(enrolled, "studentId")),
        ],
        edges: vec![
            ProposedEdge::new(START_NODE_ID, "student-enrolled"),
            ProposedEdge::new("student-enrolled", "welcome-email"),
            ProposedEdge::new("student-enrolled", "add-to-roster"),
        ],
    }
}
