//! Process graph implementation using petgraph.
//!
//! A process graph is a directed graph where nodes are workflow steps and
//! edges are transitions, optionally carrying condition expressions. The
//! graph is the unit of persistence: it serializes to the
//! `{"nodes": [...], "edges": [...]}` document stored as an opaque string on
//! the owning process definition, and that round-trip is loss-free.
//!
//! Connection legality is enforced at edge-creation time via the node-type
//! registry; everything else (condition completeness, default-branch counts)
//! is surfaced as advisory authoring notes and never blocks a save.

use crate::edge::{Edge, EdgeId, EdgeProperties};
use crate::error::GraphError;
use crate::node::{ApproveMode, AssigneeType, Node, NodeId, NodeKind};
use crate::rules::NodeTypeRegistry;
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A process graph with O(1) node and edge lookup by ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessGraph {
    /// The underlying directed graph.
    #[serde(flatten, with = "graph_serde")]
    graph: DiGraph<Node, Edge>,
    /// Map from NodeId to petgraph's NodeIndex.
    #[serde(skip)]
    node_index_map: HashMap<NodeId, NodeIndex>,
    /// Map from EdgeId to petgraph's EdgeIndex.
    #[serde(skip)]
    edge_index_map: HashMap<EdgeId, EdgeIndex>,
    /// Connection rules consulted when edges are created.
    #[serde(skip)]
    registry: NodeTypeRegistry,
}

impl ProcessGraph {
    /// Creates a new empty process graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index_map: HashMap::new(),
            edge_index_map: HashMap::new(),
            registry: NodeTypeRegistry::default(),
        }
    }

    /// Creates the graph a fresh designer document starts with: one start
    /// node and one end node, not yet connected.
    #[must_use]
    pub fn with_default_endpoints() -> Self {
        let mut graph = Self::new();
        graph.add_node(Node::new("Start", crate::node::NodeBody::Start, 300.0, 100.0));
        graph.add_node(Node::new("End", crate::node::NodeBody::End, 300.0, 400.0));
        graph
    }

    /// Replaces the connection-rule registry.
    #[must_use]
    pub fn with_registry(mut self, registry: NodeTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a node to the graph and returns its ID.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let node_id = node.id;
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        node_id
    }

    /// Removes a node, dropping every edge touching it.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let index = self.node_index_map.get(&node_id).copied()?;
        let node = self.graph.remove_node(index);
        // remove_node swaps indices around; rebuild both maps.
        self.rebuild_index_maps();
        node
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a mutable reference to a node by its ID.
    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight_mut(*index)
    }

    /// Creates an edge between two nodes, subject to the node-type rules.
    ///
    /// On rejection the edge set is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error when either endpoint is missing or the connection
    /// violates a node-type rule (the reason is user-facing).
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        properties: EdgeProperties,
    ) -> Result<EdgeId, GraphError> {
        let source_index = *self
            .node_index_map
            .get(&source)
            .ok_or(GraphError::NodeNotFound { node_id: source })?;
        let target_index = *self
            .node_index_map
            .get(&target)
            .ok_or(GraphError::NodeNotFound { node_id: target })?;

        let source_kind = self.graph[source_index].kind();
        let target_kind = self.graph[target_index].kind();
        self.registry
            .check_connection(source_kind, target_kind)
            .map_err(|reason| GraphError::ConnectionRejected {
                source,
                target,
                reason,
            })?;

        let edge = Edge::with_properties(source, target, properties);
        let edge_id = edge.id;
        let index = self.graph.add_edge(source_index, target_index, edge);
        self.edge_index_map.insert(edge_id, index);
        Ok(edge_id)
    }

    /// Removes an edge.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Option<Edge> {
        let index = self.edge_index_map.get(&edge_id).copied()?;
        let edge = self.graph.remove_edge(index);
        self.rebuild_index_maps();
        edge
    }

    /// Returns a reference to an edge by its ID.
    #[must_use]
    pub fn get_edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        let index = self.edge_index_map.get(&edge_id)?;
        self.graph.edge_weight(*index)
    }

    /// Replaces an edge's authoring properties.
    ///
    /// # Errors
    ///
    /// Returns an error when the edge does not exist.
    pub fn set_edge_properties(
        &mut self,
        edge_id: EdgeId,
        properties: EdgeProperties,
    ) -> Result<(), GraphError> {
        let index = self
            .edge_index_map
            .get(&edge_id)
            .ok_or(GraphError::EdgeNotFound { edge_id })?;
        let edge = self
            .graph
            .edge_weight_mut(*index)
            .ok_or(GraphError::EdgeNotFound { edge_id })?;
        edge.properties = properties;
        Ok(())
    }

    /// Switches a node's assignee type, clearing the previous selection.
    ///
    /// # Errors
    ///
    /// Returns an error when the node is missing, carries no assignees, or
    /// rejects the assignee type.
    pub fn set_assignee_type(
        &mut self,
        node_id: NodeId,
        assignee_type: AssigneeType,
    ) -> Result<(), GraphError> {
        let node = self
            .get_node_mut(node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        node.body.set_assignee_type(assignee_type)
    }

    /// Sets a node's approval mode.
    ///
    /// # Errors
    ///
    /// Returns an error when the node is missing or has no approval mode.
    pub fn set_approve_mode(
        &mut self,
        node_id: NodeId,
        mode: ApproveMode,
    ) -> Result<(), GraphError> {
        let node = self
            .get_node_mut(node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        node.body.set_approve_mode(mode)
    }

    /// Renames a node.
    ///
    /// # Errors
    ///
    /// Returns an error when the node does not exist.
    pub fn rename_node(&mut self, node_id: NodeId, text: impl Into<String>) -> Result<(), GraphError> {
        let node = self
            .get_node_mut(node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        node.rename(text);
        Ok(())
    }

    /// Moves a node on the canvas.
    ///
    /// # Errors
    ///
    /// Returns an error when the node does not exist.
    pub fn move_node(&mut self, node_id: NodeId, x: f64, y: f64) -> Result<(), GraphError> {
        let node = self
            .get_node_mut(node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        node.move_to(x, y);
        Ok(())
    }

    /// Returns all nodes in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Returns all edges in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the start node, if the document has one.
    #[must_use]
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes().find(|node| node.kind() == NodeKind::Start)
    }

    /// Returns the edges leaving a node in evaluation order: conditional
    /// branches by ascending priority, the default branch last.
    #[must_use]
    pub fn evaluation_order(&self, node_id: NodeId) -> Vec<&Edge> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };
        let mut edges: Vec<&Edge> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| edge.weight())
            .collect();
        edges.sort_by_key(|edge| (edge.properties.is_default, edge.properties.priority));
        edges
    }

    /// Lints the document and returns advisory notes.
    ///
    /// These mirror the hints the designer shows while authoring; they never
    /// block persistence.
    #[must_use]
    pub fn authoring_notes(&self) -> Vec<AuthoringNote> {
        let mut notes = Vec::new();

        let start_count = self
            .nodes()
            .filter(|node| node.kind() == NodeKind::Start)
            .count();
        match start_count {
            0 => notes.push(AuthoringNote::MissingStartNode),
            1 => {}
            count => notes.push(AuthoringNote::MultipleStartNodes { count }),
        }
        if !self.nodes().any(|node| node.kind() == NodeKind::End) {
            notes.push(AuthoringNote::MissingEndNode);
        }

        for node in self.nodes().filter(|node| node.kind() == NodeKind::Condition) {
            let outgoing = self.evaluation_order(node.id);
            let default_count = outgoing
                .iter()
                .filter(|edge| edge.properties.is_default)
                .count();
            if default_count > 1 {
                notes.push(AuthoringNote::ExtraDefaultBranches {
                    node_id: node.id,
                    count: default_count,
                });
            }
            for edge in outgoing {
                if !edge.properties.is_default && edge.properties.condition().is_none() {
                    notes.push(AuthoringNote::ConditionBranchMissingExpression {
                        edge_id: edge.id,
                    });
                }
            }
        }

        notes
    }

    /// Serializes the document to the opaque config blob.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_config_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Loads a document from a config blob produced by an earlier save.
    ///
    /// Properties absent from older blobs take their defaults; edges whose
    /// endpoints are missing are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is not a valid document.
    pub fn from_config_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut graph: Self = serde_json::from_str(raw)?;
        graph.rebuild_index_maps();
        Ok(graph)
    }

    /// Rebuilds the ID lookup maps after deserialization or index churn.
    pub fn rebuild_index_maps(&mut self) {
        self.node_index_map.clear();
        for index in self.graph.node_indices() {
            if let Some(node) = self.graph.node_weight(index) {
                self.node_index_map.insert(node.id, index);
            }
        }
        self.edge_index_map.clear();
        for index in self.graph.edge_indices() {
            if let Some(edge) = self.graph.edge_weight(index) {
                self.edge_index_map.insert(edge.id, index);
            }
        }
    }
}

impl Default for ProcessGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ProcessGraph {
    /// Structural equality over the node and edge sets; canvas ordering and
    /// internal indices are irrelevant.
    fn eq(&self, other: &Self) -> bool {
        let nodes: HashMap<NodeId, &Node> = self.nodes().map(|node| (node.id, node)).collect();
        let other_nodes: HashMap<NodeId, &Node> =
            other.nodes().map(|node| (node.id, node)).collect();
        if nodes != other_nodes {
            return false;
        }
        let edges: HashMap<EdgeId, &Edge> = self.edges().map(|edge| (edge.id, edge)).collect();
        let other_edges: HashMap<EdgeId, &Edge> =
            other.edges().map(|edge| (edge.id, edge)).collect();
        edges == other_edges
    }
}

/// An advisory authoring hint; never a hard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthoringNote {
    /// The document has no start node.
    MissingStartNode,
    /// The document has more than one start node.
    MultipleStartNodes { count: usize },
    /// The document has no end node.
    MissingEndNode,
    /// A non-default branch out of a condition node lacks its condition.
    ConditionBranchMissingExpression { edge_id: EdgeId },
    /// A condition node has more than one default branch.
    ExtraDefaultBranches { node_id: NodeId, count: usize },
}

impl fmt::Display for AuthoringNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStartNode => write!(f, "the flow has no start node"),
            Self::MultipleStartNodes { count } => {
                write!(f, "the flow has {count} start nodes; only one will be used")
            }
            Self::MissingEndNode => write!(f, "the flow has no end node"),
            Self::ConditionBranchMissingExpression { edge_id } => {
                write!(
                    f,
                    "branch {edge_id} has no condition; set one or mark it as the default branch"
                )
            }
            Self::ExtraDefaultBranches { node_id, count } => {
                write!(f, "node {node_id} has {count} default branches; keep one")
            }
        }
    }
}

/// Custom serde for the petgraph DiGraph.
mod graph_serde {
    use super::*;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeStruct;

    pub fn serialize<S>(graph: &DiGraph<Node, Edge>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let nodes: Vec<_> = graph.node_weights().cloned().collect();
        let edges: Vec<_> = graph.edge_weights().cloned().collect();

        let mut state = serializer.serialize_struct("ProcessGraph", 2)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DiGraph<Node, Edge>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct GraphVisitor;

        impl<'de> Visitor<'de> for GraphVisitor {
            type Value = DiGraph<Node, Edge>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a process graph with nodes and edges")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut nodes: Option<Vec<Node>> = None;
                let mut edges: Option<Vec<Edge>> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "nodes" => nodes = Some(map.next_value()?),
                        "edges" => edges = Some(map.next_value()?),
                        _ => {
                            let _ = map.next_value::<serde::de::IgnoredAny>()?;
                        }
                    }
                }

                let nodes = nodes.unwrap_or_default();
                let edges = edges.unwrap_or_default();

                let mut graph = DiGraph::new();
                let mut id_to_index = HashMap::new();

                for node in nodes {
                    let id = node.id;
                    let index = graph.add_node(node);
                    id_to_index.insert(id, index);
                }

                for edge in edges {
                    let (Some(&source_index), Some(&target_index)) = (
                        id_to_index.get(&edge.source_node_id),
                        id_to_index.get(&edge.target_node_id),
                    ) else {
                        // Dangling edges from a hand-edited or truncated
                        // document are dropped rather than failing the load.
                        continue;
                    };
                    graph.add_edge(source_index, target_index, edge);
                }

                Ok(graph)
            }
        }

        deserializer.deserialize_struct("ProcessGraph", &["nodes", "edges"], GraphVisitor)
    }
}
