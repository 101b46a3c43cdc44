//! The graph store for an open flow.
//!
//! Nodes and edges are kept in insertion order, which is also the order
//! they are persisted in. Every construction path goes through
//! [`GraphState::from_parts`], so a `GraphState` always has exactly one
//! start node and its edges always satisfy the connection rules.
//!
//! The persisted document is `{"nodes": [...], "edges": [...]}`.

use crate::activity::{self, FlowActivity};
use crate::edge::{Edge, EdgeId, ProposedEdge};
use crate::error::{ConnectionRejection, GraphError};
use crate::node::{Node, NodeId};
use crate::validate;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Nodes and edges of the open flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PersistedGraph")]
pub struct GraphState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip_serializing)]
    start_id: NodeId,
}

/// Raw persisted layout, before normalization.
#[derive(Deserialize)]
struct PersistedGraph {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl From<PersistedGraph> for GraphState {
    fn from(raw: PersistedGraph) -> Self {
        Self::from_parts(raw.nodes, raw.edges)
    }
}

impl GraphState {
    /// Creates a graph holding only the start node.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(vec![Node::start()], Vec::new())
    }

    /// Builds a graph from raw parts, restoring the graph invariants.
    ///
    /// See [`GraphState::repair`] for what gets dropped.
    #[must_use]
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self::repair(nodes, edges).0
    }

    /// Builds a graph from raw parts and reports everything it had to fix.
    ///
    /// - Duplicate node IDs and extra start nodes are dropped.
    /// - A start node is created if none is present.
    /// - Edges are replayed through the connection rules in order and
    ///   dropped if refused.
    #[must_use]
    pub fn repair(nodes: Vec<Node>, edges: Vec<Edge>) -> (Self, Vec<Repair>) {
        let mut repairs = Vec::new();
        let mut seen = HashSet::new();
        let mut start_id = None;
        let mut kept_nodes = Vec::with_capacity(nodes.len() + 1);

        for node in nodes {
            if !seen.insert(node.id.clone()) {
                warn!(node_id = %node.id, "dropping node with duplicate id");
                repairs.push(Repair::DuplicateNode { node_id: node.id });
                continue;
            }
            if node.is_start() {
                if start_id.is_some() {
                    warn!(node_id = %node.id, "dropping extra start node");
                    repairs.push(Repair::ExtraStartNode { node_id: node.id });
                    continue;
                }
                start_id = Some(node.id.clone());
            }
            kept_nodes.push(node);
        }

        let start_id = match start_id {
            Some(id) => id,
            None => {
                let mut start = Node::start();
                if seen.contains(&start.id) {
                    start.id = NodeId::generate();
                }
                debug!(node_id = %start.id, "creating missing start node");
                let id = start.id.clone();
                kept_nodes.insert(0, start);
                repairs.push(Repair::MissingStartNode {
                    created: id.clone(),
                });
                id
            }
        };

        let mut kept_edges: Vec<Edge> = Vec::with_capacity(edges.len());
        for edge in edges {
            if kept_edges.iter().any(|e| e.id == edge.id) {
                warn!(edge_id = %edge.id, "dropping edge with duplicate id");
                repairs.push(Repair::DuplicateEdge { edge_id: edge.id });
                continue;
            }
            match validate::validate_connection(&edge.as_proposal(), &kept_nodes, &kept_edges) {
                Ok(()) => kept_edges.push(edge),
                Err(rejection) => {
                    warn!(edge_id = %edge.id, %rejection, "dropping edge that breaks connection rules");
                    repairs.push(Repair::RejectedEdge {
                        edge_id: edge.id,
                        rejection,
                    });
                }
            }
        }

        let mut state = Self {
            nodes: kept_nodes,
            edges: kept_edges,
            start_id,
        };
        state.refresh_activity();
        (state, repairs)
    }

    /// Parses a persisted graph document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid graph JSON.
    pub fn parse(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Parse {
            reason: e.to_string(),
        })
    }

    /// Parses a persisted graph document, also returning what was dropped
    /// or added to make it a valid graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid graph JSON.
    pub fn parse_with_repairs(json: &str) -> Result<(Self, Vec<Repair>), GraphError> {
        let raw: PersistedGraph = serde_json::from_str(json).map_err(|e| GraphError::Parse {
            reason: e.to_string(),
        })?;
        Ok(Self::repair(raw.nodes, raw.edges))
    }

    /// Loads the graph of a flow, falling back to a fresh graph.
    ///
    /// A missing, blank or unparseable document yields a start-only graph.
    #[must_use]
    pub fn load(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Self::new();
        };
        match Self::parse(raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "persisted graph is malformed, starting fresh");
                Self::new()
            }
        }
    }

    /// Serializes the graph to its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter value cannot be serialized.
    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string(self).map_err(|e| GraphError::Serialize {
            reason: e.to_string(),
        })
    }

    /// Returns all nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the start node's ID.
    #[must_use]
    pub fn start_id(&self) -> &NodeId {
        &self.start_id
    }

    /// Returns the start node.
    #[must_use]
    pub fn start_node(&self) -> Option<&Node> {
        self.node(&self.start_id)
    }

    /// Returns a node by its ID.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// Returns an edge by its ID.
    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// Returns the edge feeding `target`, if any.
    #[must_use]
    pub fn inbound_edge(&self, target: &NodeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.target == target)
    }

    /// Returns the edges leaving `source`.
    pub fn outbound_edges<'a>(&'a self, source: &'a NodeId) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| &e.source == source)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns true when the graph holds more than the start node.
    ///
    /// Replacing such a graph with a template discards user work.
    #[must_use]
    pub fn has_user_content(&self) -> bool {
        self.nodes.len() > 1 || !self.edges.is_empty()
    }

    /// Derives the flow's activity from the current edges.
    #[must_use]
    pub fn activity(&self) -> FlowActivity {
        activity::derive_activity(&self.edges, &self.start_id)
    }

    /// Checks a proposed edge against the connection rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule the proposal breaks.
    pub fn check_connection(&self, proposed: &ProposedEdge) -> Result<(), ConnectionRejection> {
        validate::validate_connection(proposed, &self.nodes, &self.edges)
    }

    /// Drag-time check against a hovered target.
    ///
    /// # Errors
    ///
    /// Returns the first target rule the hovered node breaks.
    pub fn check_live(
        &self,
        source: Option<&NodeId>,
        target: &NodeId,
    ) -> Result<(), ConnectionRejection> {
        validate::validate_live(source, target, &self.nodes, &self.edges)
    }

    /// Recomputes activity and writes it onto the start node.
    pub(crate) fn refresh_activity(&mut self) -> FlowActivity {
        let activity = self.activity();
        let start_id = self.start_id.clone();
        if let Some(start) = self.node_mut(&start_id) {
            activity::mark_start(start, &activity);
        }
        activity
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Removes a node and every edge touching it.
    pub(crate) fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|n| &n.id == id)?;
        self.edges.retain(|e| &e.source != id && &e.target != id);
        Some(self.nodes.remove(index))
    }

    pub(crate) fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub(crate) fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let index = self.edges.iter().position(|e| &e.id == id)?;
        Some(self.edges.remove(index))
    }

    /// Analyzes reachability, cycles and parameter references.
    #[must_use]
    pub fn analyze(&self) -> GraphAnalysis {
        let mut graph: DiGraph<&NodeId, ()> = DiGraph::new();
        let mut index_map: HashMap<&NodeId, NodeIndex> = HashMap::new();
        for node in &self.nodes {
            index_map.insert(&node.id, graph.add_node(&node.id));
        }
        for edge in &self.edges {
            if let (Some(&source), Some(&target)) =
                (index_map.get(&edge.source), index_map.get(&edge.target))
            {
                graph.add_edge(source, target, ());
            }
        }

        let mut reachable = HashSet::new();
        if let Some(&start) = index_map.get(&self.start_id) {
            let mut dfs = Dfs::new(&graph, start);
            while let Some(index) = dfs.next(&graph) {
                reachable.insert(graph[index]);
            }
        }

        let disconnected = self
            .nodes
            .iter()
            .filter(|n| !reachable.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();

        let unconfigured = self
            .nodes
            .iter()
            .filter(|n| !n.is_start() && reachable.contains(&n.id) && !n.data.configured)
            .map(|n| n.id.clone())
            .collect();

        let known = &index_map;
        let dangling_references = self
            .nodes
            .iter()
            .flat_map(|n| {
                n.data.parameters.iter().filter_map(move |(key, value)| {
                    let referenced = value.referenced_node()?;
                    if known.contains_key(referenced) {
                        return None;
                    }
                    Some(DanglingReference {
                        node_id: n.id.clone(),
                        parameter: key.clone(),
                        missing: referenced.clone(),
                    })
                })
            })
            .collect();

        GraphAnalysis {
            activity: self.activity(),
            disconnected,
            unconfigured,
            has_cycle: petgraph::algo::is_cyclic_directed(&graph),
            dangling_references,
            repairs: Vec::new(),
        }
    }
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new()
    }
}

/// A parameter pointing at a node that is no longer in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    /// Node holding the parameter.
    pub node_id: NodeId,
    /// Parameter key.
    pub parameter: String,
    /// The missing node.
    pub missing: NodeId,
}

/// Something [`GraphState::repair`] changed to make raw parts a valid graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Repair {
    /// A node reused an ID already taken and was dropped.
    DuplicateNode { node_id: NodeId },
    /// A second start node was dropped.
    ExtraStartNode { node_id: NodeId },
    /// No start node was present, so one was created.
    MissingStartNode { created: NodeId },
    /// An edge reused an ID already taken and was dropped.
    DuplicateEdge { edge_id: EdgeId },
    /// An edge broke a connection rule and was dropped.
    RejectedEdge {
        edge_id: EdgeId,
        rejection: ConnectionRejection,
    },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { node_id } => write!(f, "node {node_id}: duplicate id"),
            Self::ExtraStartNode { node_id } => write!(f, "node {node_id}: extra start node"),
            Self::MissingStartNode { created } => {
                write!(f, "no start node; created {created}")
            }
            Self::DuplicateEdge { edge_id } => write!(f, "edge {edge_id}: duplicate id"),
            Self::RejectedEdge { edge_id, rejection } => write!(f, "edge {edge_id}: {rejection}"),
        }
    }
}

/// Summary of a flow's structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAnalysis {
    /// Activity derived from the edges.
    pub activity: FlowActivity,
    /// Nodes the start node cannot reach.
    pub disconnected: Vec<NodeId>,
    /// Reachable nodes still waiting for configuration.
    pub unconfigured: Vec<NodeId>,
    /// Whether any cycle exists among the nodes.
    pub has_cycle: bool,
    /// Parameters referring to missing nodes.
    pub dangling_references: Vec<DanglingReference>,
    /// Parts of the source document that did not survive loading.
    pub repairs: Vec<Repair>,
}

impl GraphAnalysis {
    /// Attaches the repairs made while loading the analyzed graph.
    #[must_use]
    pub fn with_repairs(mut self, repairs: Vec<Repair>) -> Self {
        self.repairs = repairs;
        self
    }

    /// Returns true when nothing blocks a run.
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.activity.is_active
            && !self.has_cycle
            && self.dangling_references.is_empty()
            && self.repairs.is_empty()
    }
}
