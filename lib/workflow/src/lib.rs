//! Workflow graph designer core for the opsdesk platform.
//!
//! This crate provides the model behind the visual process designer:
//!
//! - **Graph Model**: directed graphs using petgraph with typed nodes and
//!   condition-carrying edges
//! - **Node Types**: start, end, approve, handle, copy, condition
//! - **Rule Registry**: per-node-type shape, default size, and connection
//!   legality
//! - **Property Panel**: field descriptors derived from the selected element
//! - **Persistence**: an opaque JSON document round-tripped through the
//!   definition API

pub mod client;
pub mod definition;
pub mod designer;
pub mod edge;
pub mod error;
pub mod graph;
pub mod node;
pub mod panel;
pub mod rules;

pub use client::{ClientError, DefinitionApi, HttpDefinitionApi};
pub use definition::{DefinitionStatus, DefinitionSummary, ProcessDefinition};
pub use designer::{DesignerError, DesignerSession, SaveGate, Selection};
pub use edge::{Condition, ConditionOperator, Edge, EdgeId, EdgeProperties};
pub use error::{DefinitionError, GraphError};
pub use graph::{AuthoringNote, ProcessGraph};
pub use node::{
    ApprovalRules, ApproveMode, AssigneeType, Assignment, CopyRules, Node, NodeBody, NodeId,
    NodeKind,
};
pub use panel::{Choice, Control, FieldSpec, OptionSource};
pub use rules::{NodeShape, NodeTypeRegistry, NodeTypeSpec};
