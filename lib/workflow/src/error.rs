//! Error types for the workflow crate.
//!
//! - `GraphError`: graph and node property operations
//! - `DefinitionError`: definition status transitions
//!
//! The designer session and the API client define their own error types in
//! their own modules.

use crate::edge::EdgeId;
use crate::node::{AssigneeType, NodeId, NodeKind};
use std::fmt;

/// Errors from graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// The attempted connection violates a node-type rule.
    ConnectionRejected {
        source: NodeId,
        target: NodeId,
        /// User-facing explanation of the refusal.
        reason: &'static str,
    },
    /// The node kind carries no assignees.
    NoAssignees { kind: NodeKind },
    /// The assignee type is outside the subset this node kind accepts.
    AssigneeTypeNotAllowed {
        kind: NodeKind,
        assignee_type: AssigneeType,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => {
                write!(f, "node not found: {node_id}")
            }
            Self::EdgeNotFound { edge_id } => {
                write!(f, "edge not found: {edge_id}")
            }
            Self::ConnectionRejected {
                source,
                target,
                reason,
            } => {
                write!(f, "cannot connect {source} -> {target}: {reason}")
            }
            Self::NoAssignees { kind } => {
                write!(f, "{kind} nodes have no assignees")
            }
            Self::AssigneeTypeNotAllowed {
                kind,
                assignee_type,
            } => {
                write!(f, "{kind} nodes do not accept the {assignee_type} assignee type")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors from definition lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The requested status change is not a legal transition.
    InvalidStatusTransition { from: String, to: String },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStatusTransition { from, to } => {
                write!(f, "invalid status transition from {from} to {to}")
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let node_id = NodeId::new();
        let err = GraphError::NodeNotFound { node_id };
        assert!(err.to_string().contains("node not found"));
    }

    #[test]
    fn connection_rejected_carries_reason() {
        let err = GraphError::ConnectionRejected {
            source: NodeId::new(),
            target: NodeId::new(),
            reason: "an end node can only terminate a flow",
        };
        assert!(err.to_string().contains("terminate a flow"));
    }

    #[test]
    fn assignee_error_display() {
        let err = GraphError::AssigneeTypeNotAllowed {
            kind: NodeKind::Copy,
            assignee_type: AssigneeType::DeptAndRole,
        };
        assert!(err.to_string().contains("copy"));
        assert!(err.to_string().contains("dept_and_role"));
    }

    #[test]
    fn definition_error_display() {
        let err = DefinitionError::InvalidStatusTransition {
            from: "draft".to_string(),
            to: "disabled".to_string(),
        };
        assert!(err.to_string().contains("draft"));
        assert!(err.to_string().contains("disabled"));
    }
}
