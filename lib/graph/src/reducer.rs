//! Graph mutations.
//!
//! Every user action on the canvas is a [`GraphAction`]. [`reduce`] turns
//! the current graph and an action into the next graph, or refuses the
//! action and leaves the current graph untouched.

use crate::edge::{Branch, EdgeId, ProposedEdge};
use crate::error::ActionRejected;
use crate::execution::ExecutionEvent;
use crate::graph::GraphState;
use crate::node::{Node, NodeCategory, NodeId, Position};
use crate::param::ParamValue;
use crate::template::{self, Template};
use std::collections::BTreeMap;
use tracing::debug;

/// A mutation of the open flow's graph.
#[derive(Debug, Clone)]
pub enum GraphAction {
    /// Add a node. Its ID must be new and it may not be a start node.
    AddNode(Node),
    /// Connect two nodes, subject to the connection rules.
    AddEdge(ProposedEdge),
    /// Remove a node and the edges touching it. Ignored for the start node.
    DeleteNode(NodeId),
    /// Remove an edge.
    DeleteEdge(EdgeId),
    /// Move a node on the canvas.
    MoveNode { id: NodeId, position: Position },
    /// Replace a node's parameters.
    UpdateParameters {
        id: NodeId,
        parameters: BTreeMap<String, ParamValue>,
        configured: bool,
    },
    /// Replace the whole graph with a template.
    ApplyTemplate { template: Template, suffix: String },
    /// Reflect a runner event on node statuses.
    ApplyExecutionEvent(ExecutionEvent),
}

impl GraphAction {
    /// Whether the resulting change should be saved.
    ///
    /// Execution statuses are transient display state.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::ApplyExecutionEvent(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AddNode(_) => "add_node",
            Self::AddEdge(_) => "add_edge",
            Self::DeleteNode(_) => "delete_node",
            Self::DeleteEdge(_) => "delete_edge",
            Self::MoveNode { .. } => "move_node",
            Self::UpdateParameters { .. } => "update_parameters",
            Self::ApplyTemplate { .. } => "apply_template",
            Self::ApplyExecutionEvent(_) => "execution_event",
        }
    }
}

/// Applies `action` to `state`.
///
/// # Errors
///
/// Returns why the action was refused. The caller keeps `state`.
pub fn reduce(state: &GraphState, action: GraphAction) -> Result<GraphState, ActionRejected> {
    debug!(action = action.name(), "reducing graph action");
    let mut next = state.clone();

    match action {
        GraphAction::AddNode(node) => {
            if node.is_start() {
                return Err(ActionRejected::SecondStartNode);
            }
            if next.node(&node.id).is_some() {
                return Err(ActionRejected::DuplicateNode { node_id: node.id });
            }
            next.push_node(node);
        }

        GraphAction::AddEdge(mut proposed) => {
            next.check_connection(&proposed)?;
            if proposed.branch.is_none()
                && next
                    .node(&proposed.source)
                    .is_some_and(|n| n.category() == NodeCategory::Logic)
            {
                proposed.branch = Branch::from_slot(&proposed.source_handle);
            }
            next.push_edge(proposed.into_edge(EdgeId::generate()));
            next.refresh_activity();
        }

        GraphAction::DeleteNode(id) => {
            if &id == next.start_id() {
                debug!(node_id = %id, "ignoring delete of start node");
                return Ok(next);
            }
            if next.remove_node(&id).is_none() {
                return Err(ActionRejected::NodeNotFound { node_id: id });
            }
            next.refresh_activity();
        }

        GraphAction::DeleteEdge(id) => {
            if next.remove_edge(&id).is_none() {
                return Err(ActionRejected::EdgeNotFound { edge_id: id });
            }
            next.refresh_activity();
        }

        GraphAction::MoveNode { id, position } => {
            let Some(node) = next.node_mut(&id) else {
                return Err(ActionRejected::NodeNotFound { node_id: id });
            };
            node.position = position;
        }

        GraphAction::UpdateParameters {
            id,
            parameters,
            configured,
        } => {
            let Some(node) = next.node_mut(&id) else {
                return Err(ActionRejected::NodeNotFound { node_id: id });
            };
            node.data.parameters = parameters;
            node.data.configured = configured;
            node.data.status = node.resting_status();
        }

        GraphAction::ApplyTemplate { template, suffix } => {
            next = template::apply_template(&template, &suffix).into();
        }

        GraphAction::ApplyExecutionEvent(event) => event.apply_to(&mut next),
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionRejection;
    use crate::node::NodeStatus;
    use crate::testing;
    use proptest::prelude::*;
    use serde_json::json;

    fn action_node(id: &str) -> Node {
        Node::with_id(NodeId::from(id), NodeCategory::Action, id)
    }

    fn with_nodes(ids: &[&str]) -> GraphState {
        ids.iter().fold(GraphState::new(), |state, id| {
            reduce(&state, GraphAction::AddNode(action_node(id))).expect("add node")
        })
    }

    fn connect(state: &GraphState, source: &str, target: &str) -> Result<GraphState, ActionRejected> {
        reduce(state, GraphAction::AddEdge(ProposedEdge::new(source, target)))
    }

    #[test]
    fn connecting_start_activates_the_flow() {
        let state = connect(&with_nodes(&["a"]), "start-node", "a").expect("connect");
        let activity = state.activity();
        assert!(activity.is_active);
        assert_eq!(activity.first_node_id, Some(NodeId::from("a")));
        let start = state.start_node().expect("start");
        assert!(start.data.has_connection);
        assert_eq!(start.data.status, NodeStatus::Configured);
    }

    #[test]
    fn second_input_is_refused_and_state_kept() {
        let state = connect(&with_nodes(&["a", "b", "c"]), "a", "b").expect("connect");
        let result = connect(&state, "c", "b");
        let err = result.expect_err("should be refused");
        assert_eq!(
            err,
            ActionRejected::Connection(ConnectionRejection::TargetAlreadyConnected {
                target: NodeId::from("b")
            })
        );
        assert!(err.to_string().contains("already has an input connection"));
        assert_eq!(state.edge_count(), 1);
    }

    #[test]
    fn self_connection_is_refused() {
        let state = with_nodes(&["a"]);
        assert!(matches!(
            connect(&state, "a", "a"),
            Err(ActionRejected::Connection(ConnectionRejection::SelfConnection { .. }))
        ));
    }

    #[test]
    fn deleting_start_is_a_no_op() {
        let state = connect(&with_nodes(&["a"]), "start-node", "a").expect("connect");
        let next = reduce(&state, GraphAction::DeleteNode(NodeId::start())).expect("no-op");
        assert_eq!(next, state);
    }

    #[test]
    fn deleting_first_node_deactivates_the_flow() {
        let state = connect(&with_nodes(&["a", "b"]), "start-node", "a").expect("connect");
        let state = connect(&state, "a", "b").expect("connect");
        let next = reduce(&state, GraphAction::DeleteNode(NodeId::from("a"))).expect("delete");
        assert_eq!(next.edge_count(), 0);
        assert!(!next.activity().is_active);
        assert!(!next.start_node().expect("start").data.has_connection);
    }

    #[test]
    fn deleting_an_edge_frees_the_target() {
        let state = connect(&with_nodes(&["a", "b", "c"]), "a", "b").expect("connect");
        let edge_id = state.edges()[0].id.clone();
        let state = reduce(&state, GraphAction::DeleteEdge(edge_id.clone())).expect("delete");
        assert!(connect(&state, "c", "b").is_ok());
        assert_eq!(
            reduce(&state, GraphAction::DeleteEdge(edge_id.clone())),
            Err(ActionRejected::EdgeNotFound { edge_id })
        );
    }

    #[test]
    fn add_node_refuses_duplicates_and_second_start() {
        let state = with_nodes(&["a"]);
        assert_eq!(
            reduce(&state, GraphAction::AddNode(action_node("a"))),
            Err(ActionRejected::DuplicateNode {
                node_id: NodeId::from("a")
            })
        );
        let mut start = Node::start();
        start.id = NodeId::from("another-start");
        assert_eq!(
            reduce(&state, GraphAction::AddNode(start)),
            Err(ActionRejected::SecondStartNode)
        );
    }

    #[test]
    fn logic_edges_are_tagged_by_handle() {
        let state = reduce(
            &GraphState::new(),
            GraphAction::AddNode(Node::with_id("check".into(), NodeCategory::Logic, "Check")),
        )
        .expect("add logic");
        let state = reduce(&state, GraphAction::AddNode(action_node("yes"))).expect("add");
        let state = reduce(
            &state,
            GraphAction::AddEdge(ProposedEdge::new("check", "yes").with_handles("true", "input")),
        )
        .expect("connect");
        assert_eq!(state.edges()[0].branch, Some(Branch::True));
    }

    #[test]
    fn move_and_update_parameters() {
        let state = with_nodes(&["a"]);
        let state = reduce(
            &state,
            GraphAction::MoveNode {
                id: "a".into(),
                position: Position::new(10.0, 20.0),
            },
        )
        .expect("move");
        let mut parameters = BTreeMap::new();
        parameters.insert("subject".to_string(), ParamValue::from(json!("Hello")));
        let state = reduce(
            &state,
            GraphAction::UpdateParameters {
                id: "a".into(),
                parameters,
                configured: true,
            },
        )
        .expect("update");
        let node = state.node(&NodeId::from("a")).expect("node");
        assert_eq!(node.position, Position::new(10.0, 20.0));
        assert!(node.data.configured);
        assert_eq!(node.data.status, NodeStatus::Configured);

        assert!(matches!(
            reduce(
                &state,
                GraphAction::MoveNode {
                    id: "ghost".into(),
                    position: Position::default()
                }
            ),
            Err(ActionRejected::NodeNotFound { .. })
        ));
    }

    #[test]
    fn applying_a_template_replaces_everything() {
        let state = with_nodes(&["a", "b"]);
        let template = template::find("student-welcome").expect("template");
        let next = reduce(
            &state,
            GraphAction::ApplyTemplate {
                template: template.clone(),
                suffix: "99".to_string(),
            },
        )
        .expect("apply");
        assert_eq!(next.node_count(), template.nodes.len());
        assert_eq!(next.edge_count(), template.edges.len());
        assert!(next.node(&NodeId::from("a")).is_none());
        assert_eq!(next.start_id(), &NodeId::start());
        assert!(next.activity().is_active);
    }

    #[test]
    fn only_execution_events_are_transient() {
        let event = ExecutionEvent::ExecutionCompleted {
            execution_id: "exec_1".parse().expect("id"),
        };
        assert!(!GraphAction::ApplyExecutionEvent(event).is_persistent());
        assert!(GraphAction::DeleteNode(NodeId::from("a")).is_persistent());
    }

    const POOL: usize = 5;

    #[derive(Debug, Clone)]
    enum Step {
        AddNode(usize, NodeCategory),
        AddEdge(usize, usize),
        DeleteNode(usize),
        DeleteEdge(usize),
        MoveNode(usize, i32, i32),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0..POOL, testing::category()).prop_map(|(i, c)| Step::AddNode(i, c)),
            (0..=POOL, 0..=POOL).prop_map(|(s, t)| Step::AddEdge(s, t)),
            (0..=POOL).prop_map(Step::DeleteNode),
            (0..8_usize).prop_map(Step::DeleteEdge),
            (0..=POOL, -500..500, -500..500).prop_map(|(i, x, y)| Step::MoveNode(i, x, y)),
        ]
    }

    fn to_action(state: &GraphState, ids: &[NodeId], step: &Step) -> GraphAction {
        match step {
            Step::AddNode(i, category) => GraphAction::AddNode(Node::with_id(
                ids[i + 1].clone(),
                *category,
                ids[i + 1].as_str(),
            )),
            Step::AddEdge(s, t) => {
                GraphAction::AddEdge(ProposedEdge::new(ids[*s].clone(), ids[*t].clone()))
            }
            Step::DeleteNode(i) => GraphAction::DeleteNode(ids[*i].clone()),
            Step::DeleteEdge(k) => {
                let id = match state.edges() {
                    [] => EdgeId::new("missing"),
                    edges => edges[k % edges.len()].id.clone(),
                };
                GraphAction::DeleteEdge(id)
            }
            Step::MoveNode(i, x, y) => GraphAction::MoveNode {
                id: ids[*i].clone(),
                position: Position::new(f64::from(*x), f64::from(*y)),
            },
        }
    }

    proptest! {
        #[test]
        fn random_edits_keep_the_graph_valid(steps in prop::collection::vec(step(), 1..40)) {
            let ids = testing::node_ids(POOL);
            let mut state = GraphState::new();
            for step in &steps {
                let action = to_action(&state, &ids, step);
                let proposal = match &action {
                    GraphAction::AddEdge(proposed) => Some(proposed.clone()),
                    _ => None,
                };
                match reduce(&state, action) {
                    Ok(next) => {
                        if proposal.is_some() {
                            prop_assert_eq!(next.edge_count(), state.edge_count() + 1);
                        }
                        state = next;
                    }
                    Err(ActionRejected::Connection(rejection)) => {
                        let proposal = proposal.expect("only edges are checked against the rules");
                        prop_assert_eq!(state.check_connection(&proposal), Err(rejection));
                    }
                    Err(_) => {}
                }
                testing::check_invariants(&state)?;
            }

            let json = state.to_json().expect("serialize");
            let (reloaded, repairs) = GraphState::parse_with_repairs(&json).expect("parse");
            prop_assert!(repairs.is_empty(), "{:?}", repairs);
            prop_assert_eq!(reloaded, state);
        }

        #[test]
        fn accepted_edges_never_break_the_rules(
            (graph, proposal) in testing::graph_and_proposal()
        ) {
            match reduce(&graph, GraphAction::AddEdge(proposal.clone())) {
                Ok(next) => {
                    testing::check_invariants(&next)?;
                }
                Err(ActionRejected::Connection(rejection)) => {
                    prop_assert_eq!(graph.check_connection(&proposal), Err(rejection));
                }
                Err(other) => {
                    prop_assert!(false, "unexpected rejection {}", other);
                }
            }
        }
    }
}
