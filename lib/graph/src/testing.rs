//! Proptest strategies and graph invariant checks shared by the unit tests.

use crate::edge::{EdgeId, ProposedEdge};
use crate::graph::GraphState;
use crate::node::{Node, NodeCategory, NodeId};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::HashSet;

pub(crate) fn category() -> impl Strategy<Value = NodeCategory> {
    prop_oneof![
        Just(NodeCategory::Trigger),
        Just(NodeCategory::Action),
        Just(NodeCategory::Logic),
        Just(NodeCategory::Data),
    ]
}

/// Node IDs for a graph of `count` workflow nodes, start node first.
pub(crate) fn node_ids(count: usize) -> Vec<NodeId> {
    std::iter::once(NodeId::start())
        .chain((0..count).map(|i| NodeId::from(format!("n{i}"))))
        .collect()
}

/// Graphs built from arbitrary edge lists, so rule-breaking edges are
/// common before [`GraphState::from_parts`] drops them.
pub(crate) fn graph() -> impl Strategy<Value = GraphState> {
    prop::collection::vec(category(), 0..6).prop_flat_map(|categories| {
        let count = categories.len() + 1;
        prop::collection::vec((0..count, 0..count), 0..12)
            .prop_map(move |pairs| build(&categories, &pairs))
    })
}

fn build(categories: &[NodeCategory], pairs: &[(usize, usize)]) -> GraphState {
    let ids = node_ids(categories.len());
    let nodes = std::iter::once(Node::start())
        .chain(
            categories
                .iter()
                .zip(&ids[1..])
                .map(|(category, id)| Node::with_id(id.clone(), *category, id.as_str())),
        )
        .collect();
    let edges = pairs
        .iter()
        .enumerate()
        .map(|(i, (source, target))| {
            ProposedEdge::new(ids[*source].clone(), ids[*target].clone())
                .into_edge(EdgeId::new(format!("e{i}")))
        })
        .collect();
    GraphState::from_parts(nodes, edges)
}

/// A graph plus a proposal whose endpoints are drawn from its nodes and
/// one ID that is not in the graph.
pub(crate) fn graph_and_proposal() -> impl Strategy<Value = (GraphState, ProposedEdge)> {
    graph().prop_flat_map(|graph| {
        let mut ids: Vec<NodeId> = graph.nodes().iter().map(|n| n.id.clone()).collect();
        ids.push(NodeId::from("ghost"));
        let endpoint = prop::sample::select(ids);
        (Just(graph), endpoint.clone(), endpoint)
            .prop_map(|(graph, source, target)| (graph, ProposedEdge::new(source, target)))
    })
}

/// Fails the case unless `graph` satisfies every structural invariant.
pub(crate) fn check_invariants(graph: &GraphState) -> Result<(), TestCaseError> {
    let starts: Vec<_> = graph.nodes().iter().filter(|n| n.is_start()).collect();
    prop_assert_eq!(starts.len(), 1);
    prop_assert_eq!(&starts[0].id, graph.start_id());

    let mut node_ids = HashSet::new();
    for node in graph.nodes() {
        prop_assert!(node_ids.insert(&node.id), "duplicate node {}", node.id);
    }

    let mut edge_ids = HashSet::new();
    let mut targets = HashSet::new();
    let mut pairs = HashSet::new();
    for edge in graph.edges() {
        prop_assert!(edge_ids.insert(&edge.id), "duplicate edge {}", edge.id);
        prop_assert!(node_ids.contains(&edge.source), "dangling source {}", edge.source);
        prop_assert!(node_ids.contains(&edge.target), "dangling target {}", edge.target);
        prop_assert_ne!(&edge.target, graph.start_id());
        prop_assert_ne!(&edge.source, &edge.target);
        prop_assert!(targets.insert(&edge.target), "second input on {}", edge.target);
        prop_assert!(pairs.insert((&edge.source, &edge.target)));
    }

    let activity = graph.activity();
    prop_assert_eq!(
        graph.start_node().map(|n| n.data.has_connection),
        Some(activity.is_active)
    );
    Ok(())
}
