//! Connection rules.
//!
//! Rules are checked in a fixed order and the first failure is reported:
//!
//! 1. The start node never receives input.
//! 2. A node accepts at most one inbound edge, whatever the slot.
//! 3. Both endpoints must exist.
//! 4. No self-connections.
//! 5. No second edge between the same source and target.
//!
//! Slot data types are not compared.

use crate::edge::{Edge, ProposedEdge};
use crate::error::ConnectionRejection;
use crate::node::{Node, NodeId};

/// Decides whether `proposed` may be added to the graph.
///
/// # Errors
///
/// Returns the first rule the proposal breaks.
pub fn validate_connection(
    proposed: &ProposedEdge,
    nodes: &[Node],
    edges: &[Edge],
) -> Result<(), ConnectionRejection> {
    check_target(&proposed.target, nodes, edges)?;

    for endpoint in [&proposed.source, &proposed.target] {
        if !nodes.iter().any(|n| &n.id == endpoint) {
            return Err(ConnectionRejection::DanglingEndpoint {
                node_id: endpoint.clone(),
            });
        }
    }

    if proposed.source == proposed.target {
        return Err(ConnectionRejection::SelfConnection {
            node_id: proposed.source.clone(),
        });
    }

    if edges
        .iter()
        .any(|e| e.source == proposed.source && e.target == proposed.target)
    {
        return Err(ConnectionRejection::DuplicateConnection {
            source: proposed.source.clone(),
            target: proposed.target.clone(),
        });
    }

    Ok(())
}

/// Feedback check while a connection is being dragged.
///
/// Only the rules that depend on the hovered target are evaluated, plus the
/// self-connection rule when the drag's source is known.
///
/// # Errors
///
/// Returns the first rule the hovered target breaks.
pub fn validate_live(
    source: Option<&NodeId>,
    target: &NodeId,
    nodes: &[Node],
    edges: &[Edge],
) -> Result<(), ConnectionRejection> {
    check_target(target, nodes, edges)?;
    if source == Some(target) {
        return Err(ConnectionRejection::SelfConnection {
            node_id: target.clone(),
        });
    }
    Ok(())
}

/// Rules 1 and 2.
fn check_target(
    target: &NodeId,
    nodes: &[Node],
    edges: &[Edge],
) -> Result<(), ConnectionRejection> {
    if nodes.iter().any(|n| n.is_start() && &n.id == target) {
        return Err(ConnectionRejection::StartNodeInput);
    }
    if edges.iter().any(|e| &e.target == target) {
        return Err(ConnectionRejection::TargetAlreadyConnected {
            target: target.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeId;
    use crate::node::NodeCategory;
    use crate::testing;
    use proptest::prelude::*;

    fn node(id: &str) -> Node {
        Node::with_id(NodeId::from(id), NodeCategory::Action, id)
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        ProposedEdge::new(source, target).into_edge(EdgeId::new(id))
    }

    fn nodes() -> Vec<Node> {
        vec![Node::start(), node("a"), node("b"), node("c")]
    }

    #[test]
    fn accepts_start_to_unconnected_node() {
        let result = validate_connection(&ProposedEdge::new("start-node", "a"), &nodes(), &[]);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn rejects_edges_into_start_before_any_other_rule() {
        // Also a self-loop and a duplicate; the start rule still wins.
        let edges = vec![edge("e1", "start-node", "start-node")];
        let result = validate_connection(
            &ProposedEdge::new("start-node", "start-node"),
            &nodes(),
            &edges,
        );
        assert_eq!(result, Err(ConnectionRejection::StartNodeInput));
    }

    #[test]
    fn rejects_second_input_regardless_of_slot() {
        let edges = vec![edge("e1", "a", "b")];
        let proposal = ProposedEdge::new("c", "b").with_handles("output", "other-slot");
        let result = validate_connection(&proposal, &nodes(), &edges);
        assert_eq!(
            result,
            Err(ConnectionRejection::TargetAlreadyConnected {
                target: NodeId::from("b")
            })
        );
        assert!(result.unwrap_err().to_string().contains("already has an input connection"));
    }

    #[test]
    fn rejects_missing_endpoints() {
        let result = validate_connection(&ProposedEdge::new("ghost", "a"), &nodes(), &[]);
        assert_eq!(
            result,
            Err(ConnectionRejection::DanglingEndpoint {
                node_id: NodeId::from("ghost")
            })
        );
    }

    #[test]
    fn rejects_self_loop_on_empty_and_busy_graphs() {
        let proposal = ProposedEdge::new("a", "a");
        assert_eq!(
            validate_connection(&proposal, &nodes(), &[]),
            Err(ConnectionRejection::SelfConnection {
                node_id: NodeId::from("a")
            })
        );
        let busy = vec![edge("e1", "start-node", "b"), edge("e2", "b", "c")];
        assert!(validate_connection(&proposal, &nodes(), &busy).is_err());
    }

    #[test]
    fn duplicate_pair_is_caught_by_in_degree_first() {
        // A duplicate (source, target) pair always trips the in-degree rule
        // first, since the target of the existing edge is already connected.
        let edges = vec![edge("e1", "a", "b")];
        let result = validate_connection(&ProposedEdge::new("a", "b"), &nodes(), &edges);
        assert!(matches!(
            result,
            Err(ConnectionRejection::TargetAlreadyConnected { .. })
        ));
    }

    #[test]
    fn slot_types_are_not_compared() {
        let mut target = node("typed");
        target.data.inputs[0].data_type = crate::slot::DataType::new("Number");
        let nodes = vec![Node::start(), node("a"), target];
        let result = validate_connection(&ProposedEdge::new("a", "typed"), &nodes, &[]);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn live_check_flags_start_and_busy_targets() {
        let edges = vec![edge("e1", "a", "b")];
        assert_eq!(
            validate_live(None, &NodeId::start(), &nodes(), &edges),
            Err(ConnectionRejection::StartNodeInput)
        );
        assert!(validate_live(Some(&NodeId::from("c")), &NodeId::from("b"), &nodes(), &edges).is_err());
        assert_eq!(
            validate_live(Some(&NodeId::from("a")), &NodeId::from("c"), &nodes(), &edges),
            Ok(())
        );
    }

    #[test]
    fn live_check_flags_self_connection() {
        let target = NodeId::from("c");
        assert!(matches!(
            validate_live(Some(&target), &target, &nodes(), &[]),
            Err(ConnectionRejection::SelfConnection { .. })
        ));
    }

    proptest! {
        #[test]
        fn start_node_never_accepts_input((graph, proposal) in testing::graph_and_proposal()) {
            let result = validate_connection(&proposal, graph.nodes(), graph.edges());
            if &proposal.target == graph.start_id() {
                prop_assert_eq!(result, Err(ConnectionRejection::StartNodeInput));
            }
        }

        #[test]
        fn connected_target_refuses_a_second_input(
            (graph, proposal) in testing::graph_and_proposal()
        ) {
            let result = validate_connection(&proposal, graph.nodes(), graph.edges());
            if &proposal.target != graph.start_id()
                && graph.inbound_edge(&proposal.target).is_some()
            {
                prop_assert_eq!(
                    result,
                    Err(ConnectionRejection::TargetAlreadyConnected {
                        target: proposal.target.clone(),
                    })
                );
            }
        }

        #[test]
        fn missing_endpoints_are_refused((graph, proposal) in testing::graph_and_proposal()) {
            let result = validate_connection(&proposal, graph.nodes(), graph.edges());
            let missing = [&proposal.source, &proposal.target]
                .into_iter()
                .find(|id| graph.node(id).is_none());
            if let Some(missing) = missing {
                prop_assert!(result.is_err());
                if &proposal.target != graph.start_id()
                    && graph.inbound_edge(&proposal.target).is_none()
                {
                    prop_assert_eq!(
                        result,
                        Err(ConnectionRejection::DanglingEndpoint {
                            node_id: missing.clone(),
                        })
                    );
                }
            }
        }

        #[test]
        fn live_check_agrees_with_the_target_rules(
            (graph, proposal) in testing::graph_and_proposal()
        ) {
            let full = validate_connection(&proposal, graph.nodes(), graph.edges());
            let live = validate_live(
                Some(&proposal.source),
                &proposal.target,
                graph.nodes(),
                graph.edges(),
            );
            if let Err(rejection) = live {
                prop_assert!(full.is_err());
                if !matches!(rejection, ConnectionRejection::SelfConnection { .. }) {
                    prop_assert_eq!(full, Err(rejection));
                }
            }
        }
    }
}
