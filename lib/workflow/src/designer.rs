//! The designer session: one open document being edited.
//!
//! All canvas edits are synchronous mutations of the in-memory graph. The
//! only asynchronous work is the save/publish round trip, and at most one of
//! those may be in flight at a time: a second save while one is pending is
//! rejected rather than interleaved, so a stale or partial document can
//! never be written. A failed remote call leaves the in-memory document
//! untouched for retry.

use crate::client::{ClientError, DefinitionApi};
use crate::definition::ProcessDefinition;
use crate::edge::{EdgeId, EdgeProperties};
use crate::error::{DefinitionError, GraphError};
use crate::graph::ProcessGraph;
use crate::node::{AssigneeType, Node, NodeId};
use crate::panel::{self, FieldSpec};
use opsdesk_core::DefinitionId;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Errors from designer operations.
#[derive(Debug)]
pub enum DesignerError {
    /// A save or publish is already in flight.
    SaveInFlight,
    /// Publish was requested before the definition was ever saved.
    NeverSaved,
    /// The persisted blob could not be encoded or decoded.
    Config { message: String },
    /// A graph operation failed.
    Graph(GraphError),
    /// A definition status transition failed.
    Definition(DefinitionError),
    /// A remote call failed.
    Client(ClientError),
}

impl fmt::Display for DesignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SaveInFlight => write!(f, "a save is already in progress"),
            Self::NeverSaved => write!(f, "save the process before publishing it"),
            Self::Config { message } => write!(f, "invalid process document: {message}"),
            Self::Graph(err) => write!(f, "{err}"),
            Self::Definition(err) => write!(f, "{err}"),
            Self::Client(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DesignerError {}

impl From<GraphError> for DesignerError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

impl From<DefinitionError> for DesignerError {
    fn from(err: DefinitionError) -> Self {
        Self::Definition(err)
    }
}

impl From<ClientError> for DesignerError {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

/// Single-flight gate for remote writes.
///
/// `begin` hands out a guard while the gate is free; the gate reopens when
/// the guard drops, success or failure alike.
#[derive(Debug, Default)]
pub struct SaveGate {
    busy: Arc<AtomicBool>,
}

impl SaveGate {
    /// Creates an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate. Returns `None` while another guard is live.
    #[must_use]
    pub fn begin(&self) -> Option<SaveGuard> {
        if self.busy.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(SaveGuard {
                busy: Arc::clone(&self.busy),
            })
        }
    }

    /// Returns true while a guard is live.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Claim on the save gate; dropping it reopens the gate.
#[derive(Debug)]
pub struct SaveGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// The currently selected canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    None,
    /// A node is selected.
    Node(NodeId),
    /// An edge is selected.
    Edge(EdgeId),
}

/// One open designer document.
#[derive(Debug)]
pub struct DesignerSession<A: DefinitionApi> {
    api: A,
    definition: ProcessDefinition,
    graph: ProcessGraph,
    selection: Selection,
    gate: SaveGate,
    saved: bool,
}

impl<A: DefinitionApi> DesignerSession<A> {
    /// Starts a new draft with the default start/end pair on the canvas.
    #[must_use]
    pub fn new_draft(api: A, name: impl Into<String>, process_key: impl Into<String>) -> Self {
        Self {
            api,
            definition: ProcessDefinition::new(name, process_key),
            graph: ProcessGraph::with_default_endpoints(),
            selection: Selection::None,
            gate: SaveGate::new(),
            saved: false,
        }
    }

    /// Opens an existing definition for editing.
    ///
    /// A definition without a stored document gets the default start/end
    /// pair; a corrupt document is an error and nothing is partially loaded.
    ///
    /// # Errors
    ///
    /// Returns an error when the load fails or the stored blob is invalid.
    pub async fn open(api: A, id: DefinitionId) -> Result<Self, DesignerError> {
        let definition = api.load(id).await?;
        let graph = match definition.process_config.as_deref() {
            Some(blob) => ProcessGraph::from_config_json(blob).map_err(|e| {
                DesignerError::Config {
                    message: e.to_string(),
                }
            })?,
            None => ProcessGraph::with_default_endpoints(),
        };
        Ok(Self {
            api,
            definition,
            graph,
            selection: Selection::None,
            gate: SaveGate::new(),
            saved: true,
        })
    }

    /// The definition being edited.
    #[must_use]
    pub fn definition(&self) -> &ProcessDefinition {
        &self.definition
    }

    /// Mutable access to the definition metadata (name, category, ...).
    pub fn definition_mut(&mut self) -> &mut ProcessDefinition {
        &mut self.definition
    }

    /// The document being edited.
    #[must_use]
    pub fn graph(&self) -> &ProcessGraph {
        &self.graph
    }

    /// Mutable access to the document for canvas edits.
    pub fn graph_mut(&mut self) -> &mut ProcessGraph {
        &mut self.graph
    }

    /// Selects a node.
    ///
    /// # Errors
    ///
    /// Returns an error when the node does not exist.
    pub fn select_node(&mut self, node_id: NodeId) -> Result<(), DesignerError> {
        if self.graph.get_node(node_id).is_none() {
            return Err(GraphError::NodeNotFound { node_id }.into());
        }
        self.selection = Selection::Node(node_id);
        Ok(())
    }

    /// Selects an edge.
    ///
    /// # Errors
    ///
    /// Returns an error when the edge does not exist.
    pub fn select_edge(&mut self, edge_id: EdgeId) -> Result<(), DesignerError> {
        if self.graph.get_edge(edge_id).is_none() {
            return Err(GraphError::EdgeNotFound { edge_id }.into());
        }
        self.selection = Selection::Edge(edge_id);
        Ok(())
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    /// The current selection.
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Property-panel fields for the current selection.
    ///
    /// A pure function of the selected element; an empty list means the
    /// panel shows its placeholder.
    #[must_use]
    pub fn panel_fields(&self) -> Vec<FieldSpec> {
        match self.selection {
            Selection::None => Vec::new(),
            Selection::Node(node_id) => self
                .graph
                .get_node(node_id)
                .map(panel::fields_for_node)
                .unwrap_or_default(),
            Selection::Edge(edge_id) => self
                .graph
                .get_edge(edge_id)
                .map(panel::fields_for_edge)
                .unwrap_or_default(),
        }
    }

    /// Adds a node to the canvas.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.graph.add_node(node)
    }

    /// Connects two nodes, subject to the node-type rules.
    ///
    /// # Errors
    ///
    /// Returns an error with a user-facing reason when the connection is
    /// rejected; the document is unchanged.
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        properties: EdgeProperties,
    ) -> Result<EdgeId, DesignerError> {
        Ok(self.graph.connect(source, target, properties)?)
    }

    /// Switches the selected or given node's assignee type.
    ///
    /// # Errors
    ///
    /// See [`ProcessGraph::set_assignee_type`].
    pub fn set_assignee_type(
        &mut self,
        node_id: NodeId,
        assignee_type: AssigneeType,
    ) -> Result<(), DesignerError> {
        Ok(self.graph.set_assignee_type(node_id, assignee_type)?)
    }

    /// True while a save or publish is in flight.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.gate.is_busy()
    }

    /// Serializes the document and upserts the definition.
    ///
    /// # Errors
    ///
    /// Returns [`DesignerError::SaveInFlight`] when another save is pending.
    /// On a remote failure the in-memory document is unchanged and the save
    /// may simply be retried.
    pub async fn save(&mut self) -> Result<DefinitionId, DesignerError> {
        let _guard = self.gate.begin().ok_or(DesignerError::SaveInFlight)?;

        let blob = self
            .graph
            .to_config_json()
            .map_err(|e| DesignerError::Config {
                message: e.to_string(),
            })?;
        self.definition.process_config = Some(blob);
        self.definition.touch();

        let id = self.api.save(&self.definition).await?;
        self.saved = true;
        tracing::info!(definition = %id, "process definition saved");
        Ok(id)
    }

    /// Publishes the definition. Requires a prior successful save.
    ///
    /// # Errors
    ///
    /// Returns [`DesignerError::NeverSaved`] before the first save, and
    /// [`DesignerError::SaveInFlight`] while another remote write is pending.
    pub async fn publish(&mut self) -> Result<(), DesignerError> {
        if !self.saved {
            return Err(DesignerError::NeverSaved);
        }
        let _guard = self.gate.begin().ok_or(DesignerError::SaveInFlight)?;

        self.api.publish(self.definition.id).await?;
        self.definition.publish()?;
        tracing::info!(definition = %self.definition.id, "process definition published");
        Ok(())
    }

    /// Copies the saved definition server-side and returns the new ID.
    ///
    /// # Errors
    ///
    /// Returns an error when the definition was never saved or the call
    /// fails.
    pub async fn copy(&self) -> Result<DefinitionId, DesignerError> {
        if !self.saved {
            return Err(DesignerError::NeverSaved);
        }
        Ok(self.api.copy(self.definition.id).await?)
    }
}
