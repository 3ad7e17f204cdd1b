//! Per-node-type rendering and connection rules.
//!
//! One registry entry per node kind carries everything the canvas needs to
//! know about that kind: its shape and default size, its palette label, and
//! whether it may act as a connection source or target. Adding a node type
//! is one new entry.
//!
//! Connection legality is deliberately minimal: an end node can never start
//! a connection and a start node can never receive one. Everything else is
//! permitted; condition/default-branch hygiene is authoring guidance
//! surfaced by the graph lint, not a hard constraint.

use crate::node::NodeKind;
use std::collections::HashMap;

/// The canvas shape of a node kind, with its default size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeShape {
    /// A circle of the given radius.
    Circle { radius: f64 },
    /// A rounded rectangle.
    RoundedRect {
        width: f64,
        height: f64,
        corner: f64,
    },
    /// A diamond with the given half-axes.
    Diamond { rx: f64, ry: f64 },
}

/// Everything the canvas knows about one node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTypeSpec {
    /// The node kind this entry describes.
    pub kind: NodeKind,
    /// Label shown in the node palette and used for fresh nodes.
    pub default_label: &'static str,
    /// Shape and default size.
    pub shape: NodeShape,
    /// Whether an edge may leave this node.
    pub can_be_source: bool,
    /// Whether an edge may enter this node.
    pub can_be_target: bool,
    /// User-facing reason shown when a connection from this node is refused.
    pub source_refusal: Option<&'static str>,
    /// User-facing reason shown when a connection to this node is refused.
    pub target_refusal: Option<&'static str>,
}

/// Registry of node-type specs, keyed by kind.
#[derive(Debug, Clone)]
pub struct NodeTypeRegistry {
    specs: HashMap<NodeKind, NodeTypeSpec>,
}

impl NodeTypeRegistry {
    /// Returns the spec for a kind, if registered.
    #[must_use]
    pub fn spec(&self, kind: NodeKind) -> Option<&NodeTypeSpec> {
        self.specs.get(&kind)
    }

    /// Registers or replaces a spec.
    pub fn register(&mut self, spec: NodeTypeSpec) {
        self.specs.insert(spec.kind, spec);
    }

    /// Checks whether an edge may run from `source` to `target`.
    ///
    /// # Errors
    ///
    /// Returns the user-facing refusal reason when either endpoint rule
    /// forbids the connection. Kinds without a registered spec are permitted.
    pub fn check_connection(
        &self,
        source: NodeKind,
        target: NodeKind,
    ) -> Result<(), &'static str> {
        if let Some(spec) = self.specs.get(&source) {
            if !spec.can_be_source {
                return Err(spec
                    .source_refusal
                    .unwrap_or("this node cannot start a connection"));
            }
        }
        if let Some(spec) = self.specs.get(&target) {
            if !spec.can_be_target {
                return Err(spec
                    .target_refusal
                    .unwrap_or("this node cannot receive a connection"));
            }
        }
        Ok(())
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            specs: HashMap::new(),
        };
        registry.register(NodeTypeSpec {
            kind: NodeKind::Start,
            default_label: "Start",
            shape: NodeShape::Circle { radius: 30.0 },
            can_be_source: true,
            can_be_target: false,
            source_refusal: None,
            target_refusal: Some("a start node can only begin a flow"),
        });
        registry.register(NodeTypeSpec {
            kind: NodeKind::End,
            default_label: "End",
            shape: NodeShape::Circle { radius: 30.0 },
            can_be_source: false,
            can_be_target: true,
            source_refusal: Some("an end node can only terminate a flow"),
            target_refusal: None,
        });
        registry.register(NodeTypeSpec {
            kind: NodeKind::Approve,
            default_label: "Approval",
            shape: NodeShape::RoundedRect {
                width: 120.0,
                height: 50.0,
                corner: 8.0,
            },
            can_be_source: true,
            can_be_target: true,
            source_refusal: None,
            target_refusal: None,
        });
        registry.register(NodeTypeSpec {
            kind: NodeKind::Handle,
            default_label: "Handling",
            shape: NodeShape::RoundedRect {
                width: 120.0,
                height: 50.0,
                corner: 8.0,
            },
            can_be_source: true,
            can_be_target: true,
            source_refusal: None,
            target_refusal: None,
        });
        registry.register(NodeTypeSpec {
            kind: NodeKind::Copy,
            default_label: "Carbon copy",
            shape: NodeShape::RoundedRect {
                width: 120.0,
                height: 50.0,
                corner: 8.0,
            },
            can_be_source: true,
            can_be_target: true,
            source_refusal: None,
            target_refusal: None,
        });
        registry.register(NodeTypeSpec {
            kind: NodeKind::Condition,
            default_label: "Condition",
            shape: NodeShape::Diamond { rx: 50.0, ry: 35.0 },
            can_be_source: true,
            can_be_target: true,
            source_refusal: None,
            target_refusal: None,
        });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_every_kind() {
        let registry = NodeTypeRegistry::default();
        for kind in [
            NodeKind::Start,
            NodeKind::End,
            NodeKind::Approve,
            NodeKind::Handle,
            NodeKind::Copy,
            NodeKind::Condition,
        ] {
            assert!(registry.spec(kind).is_some(), "missing spec for {kind}");
        }
    }

    #[test]
    fn end_node_cannot_be_a_source() {
        let registry = NodeTypeRegistry::default();
        let err = registry
            .check_connection(NodeKind::End, NodeKind::Approve)
            .unwrap_err();
        assert_eq!(err, "an end node can only terminate a flow");
    }

    #[test]
    fn start_node_cannot_be_a_target() {
        let registry = NodeTypeRegistry::default();
        let err = registry
            .check_connection(NodeKind::Approve, NodeKind::Start)
            .unwrap_err();
        assert_eq!(err, "a start node can only begin a flow");
    }

    #[test]
    fn ordinary_connections_are_permitted() {
        let registry = NodeTypeRegistry::default();
        assert!(registry
            .check_connection(NodeKind::Start, NodeKind::Approve)
            .is_ok());
        assert!(registry
            .check_connection(NodeKind::Condition, NodeKind::Copy)
            .is_ok());
        assert!(registry
            .check_connection(NodeKind::Handle, NodeKind::End)
            .is_ok());
        // Even unusual shapes are allowed; only the two endpoint rules apply.
        assert!(registry
            .check_connection(NodeKind::Approve, NodeKind::Approve)
            .is_ok());
    }

    #[test]
    fn default_sizes_match_the_canvas() {
        let registry = NodeTypeRegistry::default();
        assert_eq!(
            registry.spec(NodeKind::Start).unwrap().shape,
            NodeShape::Circle { radius: 30.0 }
        );
        assert_eq!(
            registry.spec(NodeKind::Approve).unwrap().shape,
            NodeShape::RoundedRect {
                width: 120.0,
                height: 50.0,
                corner: 8.0
            }
        );
        assert_eq!(
            registry.spec(NodeKind::Condition).unwrap().shape,
            NodeShape::Diamond { rx: 50.0, ry: 35.0 }
        );
    }

    #[test]
    fn registering_replaces_an_entry() {
        let mut registry = NodeTypeRegistry::default();
        registry.register(NodeTypeSpec {
            kind: NodeKind::Copy,
            default_label: "CC",
            shape: NodeShape::RoundedRect {
                width: 100.0,
                height: 40.0,
                corner: 4.0,
            },
            can_be_source: true,
            can_be_target: true,
            source_refusal: None,
            target_refusal: None,
        });
        assert_eq!(registry.spec(NodeKind::Copy).unwrap().default_label, "CC");
    }
}
