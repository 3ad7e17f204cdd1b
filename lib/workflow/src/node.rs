//! Workflow node types and their authoring properties.
//!
//! Nodes are the building blocks of a process graph. Each node has:
//! - A unique ID within the document, assigned once and stable for its life
//! - A kind (start, end, approve, handle, copy, condition)
//! - Kind-specific properties (approval mode, assignee resolution)
//! - A canvas position and a display label
//!
//! A node serializes as `{id, type, x, y, text, properties}`, the shape the
//! persisted graph document uses.

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use opsdesk_core::{DeptId, RoleId, UserId};
use ulid::Ulid;

/// A unique identifier for a node within a process graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Ulid);

impl NodeId {
    /// Creates a new random node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates a node ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("node_").unwrap_or(s);
        Ulid::from_str(raw).map(Self)
    }
}

/// The kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The flow's entry point; never a connection target.
    Start,
    /// A terminus; never a connection source.
    End,
    /// An approval step (pass/reject decision).
    Approve,
    /// A handling step (work done, no pass/reject semantics).
    Handle,
    /// Carbon-copy recipients; informational only.
    Copy,
    /// A branch point; branching logic lives on its outgoing edges.
    Condition,
}

impl NodeKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Approve => "approve",
            Self::Handle => "handle",
            Self::Copy => "copy",
            Self::Condition => "condition",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a multi-assignee approval step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproveMode {
    /// Any single assignee passing completes the step.
    #[default]
    Or,
    /// Every assignee must pass.
    And,
    /// Assignees act one after another, in order.
    Sequential,
}

/// Policy for resolving who must act on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeType {
    /// A fixed list of users.
    FixedUsers,
    /// Everyone holding one of a fixed list of roles.
    FixedRoles,
    /// Role holders within selected departments.
    DeptAndRole,
    /// The initiator picks assignees when starting the flow.
    SelfSelect,
    /// The initiator's manager, looked up at runtime.
    ManagerLookup,
    /// The initiator handles the step themselves.
    SelfHandle,
}

impl AssigneeType {
    /// Returns the wire name of this assignee type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedUsers => "fixed_users",
            Self::FixedRoles => "fixed_roles",
            Self::DeptAndRole => "dept_and_role",
            Self::SelfSelect => "self_select",
            Self::ManagerLookup => "manager_lookup",
            Self::SelfHandle => "self_handle",
        }
    }
}

impl fmt::Display for AssigneeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved assignee selection for a step.
///
/// Switching the assignee type replaces the whole variant, so any ids picked
/// under the previous type are cleared rather than silently carried over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assignment {
    /// A fixed list of users.
    FixedUsers {
        #[serde(default)]
        user_ids: Vec<UserId>,
    },
    /// A fixed list of roles.
    FixedRoles {
        #[serde(default)]
        role_ids: Vec<RoleId>,
    },
    /// Role holders within the selected departments.
    DeptAndRole {
        #[serde(default)]
        dept_ids: Vec<DeptId>,
        #[serde(default)]
        role_ids: Vec<RoleId>,
    },
    /// The initiator picks assignees at start time.
    SelfSelect,
    /// The initiator's manager.
    ManagerLookup,
    /// The initiator themselves.
    SelfHandle,
}

impl Assignment {
    /// Builds a fresh, empty assignment of the given type.
    #[must_use]
    pub fn empty_of(assignee_type: AssigneeType) -> Self {
        match assignee_type {
            AssigneeType::FixedUsers => Self::FixedUsers {
                user_ids: Vec::new(),
            },
            AssigneeType::FixedRoles => Self::FixedRoles {
                role_ids: Vec::new(),
            },
            AssigneeType::DeptAndRole => Self::DeptAndRole {
                dept_ids: Vec::new(),
                role_ids: Vec::new(),
            },
            AssigneeType::SelfSelect => Self::SelfSelect,
            AssigneeType::ManagerLookup => Self::ManagerLookup,
            AssigneeType::SelfHandle => Self::SelfHandle,
        }
    }

    /// Returns the assignee type of this assignment.
    #[must_use]
    pub fn assignee_type(&self) -> AssigneeType {
        match self {
            Self::FixedUsers { .. } => AssigneeType::FixedUsers,
            Self::FixedRoles { .. } => AssigneeType::FixedRoles,
            Self::DeptAndRole { .. } => AssigneeType::DeptAndRole,
            Self::SelfSelect => AssigneeType::SelfSelect,
            Self::ManagerLookup => AssigneeType::ManagerLookup,
            Self::SelfHandle => AssigneeType::SelfHandle,
        }
    }

    /// Returns true when the assignment needs no further selection, or when
    /// at least one id has been picked.
    #[must_use]
    pub fn has_selection(&self) -> bool {
        match self {
            Self::FixedUsers { user_ids } => !user_ids.is_empty(),
            Self::FixedRoles { role_ids } => !role_ids.is_empty(),
            Self::DeptAndRole { role_ids, .. } => !role_ids.is_empty(),
            Self::SelfSelect | Self::ManagerLookup | Self::SelfHandle => true,
        }
    }
}

impl Default for Assignment {
    fn default() -> Self {
        Self::SelfSelect
    }
}

/// The assignee types a copy node accepts.
pub const COPY_ASSIGNEE_TYPES: [AssigneeType; 4] = [
    AssigneeType::FixedUsers,
    AssigneeType::FixedRoles,
    AssigneeType::ManagerLookup,
    AssigneeType::SelfHandle,
];

/// Authoring properties for approve and handle nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApprovalRules {
    /// How a multi-assignee step completes.
    #[serde(default)]
    pub mode: ApproveMode,
    /// Who must act.
    #[serde(default)]
    pub assignment: Assignment,
}

/// Authoring properties for copy nodes.
///
/// Only a subset of assignee types applies; see [`COPY_ASSIGNEE_TYPES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyRules {
    /// Who receives the copy.
    #[serde(default = "CopyRules::default_assignment")]
    pub assignment: Assignment,
}

impl CopyRules {
    fn default_assignment() -> Assignment {
        Assignment::SelfHandle
    }
}

impl Default for CopyRules {
    fn default() -> Self {
        Self {
            assignment: Self::default_assignment(),
        }
    }
}

/// Kind tag and kind-specific properties of a node.
///
/// Serializes adjacently as `"type"` plus `"properties"`, matching the
/// persisted document shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "snake_case")]
pub enum NodeBody {
    /// The flow entry point.
    Start,
    /// A flow terminus.
    End,
    /// An approval step.
    Approve(ApprovalRules),
    /// A handling step.
    Handle(ApprovalRules),
    /// Carbon-copy recipients.
    Copy(CopyRules),
    /// A branch point; conditions live on outgoing edges.
    Condition,
}

impl NodeBody {
    /// Returns the kind of this body.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Start => NodeKind::Start,
            Self::End => NodeKind::End,
            Self::Approve(_) => NodeKind::Approve,
            Self::Handle(_) => NodeKind::Handle,
            Self::Copy(_) => NodeKind::Copy,
            Self::Condition => NodeKind::Condition,
        }
    }

    /// Returns the assignment, for kinds that carry one.
    #[must_use]
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Self::Approve(rules) | Self::Handle(rules) => Some(&rules.assignment),
            Self::Copy(rules) => Some(&rules.assignment),
            Self::Start | Self::End | Self::Condition => None,
        }
    }

    /// Switches the assignee type, clearing any previously picked ids.
    ///
    /// # Errors
    ///
    /// Returns an error when this kind carries no assignees, or when a copy
    /// node is given an assignee type outside its allowed subset.
    pub fn set_assignee_type(&mut self, assignee_type: AssigneeType) -> Result<(), GraphError> {
        match self {
            Self::Approve(rules) | Self::Handle(rules) => {
                rules.assignment = Assignment::empty_of(assignee_type);
                Ok(())
            }
            Self::Copy(rules) => {
                if !COPY_ASSIGNEE_TYPES.contains(&assignee_type) {
                    return Err(GraphError::AssigneeTypeNotAllowed {
                        kind: NodeKind::Copy,
                        assignee_type,
                    });
                }
                rules.assignment = Assignment::empty_of(assignee_type);
                Ok(())
            }
            Self::Start | Self::End | Self::Condition => Err(GraphError::NoAssignees {
                kind: self.kind(),
            }),
        }
    }

    /// Sets the approval mode on approve and handle nodes.
    ///
    /// # Errors
    ///
    /// Returns an error for kinds without an approval mode.
    pub fn set_approve_mode(&mut self, mode: ApproveMode) -> Result<(), GraphError> {
        match self {
            Self::Approve(rules) | Self::Handle(rules) => {
                rules.mode = mode;
                Ok(())
            }
            _ => Err(GraphError::NoAssignees { kind: self.kind() }),
        }
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, stable for the life of the document.
    pub id: NodeId,
    /// Kind and kind-specific properties.
    #[serde(flatten)]
    pub body: NodeBody,
    /// Canvas x coordinate.
    #[serde(default)]
    pub x: f64,
    /// Canvas y coordinate.
    #[serde(default)]
    pub y: f64,
    /// Display label.
    #[serde(default)]
    pub text: String,
}

impl Node {
    /// Creates a new node at the given canvas position.
    #[must_use]
    pub fn new(text: impl Into<String>, body: NodeBody, x: f64, y: f64) -> Self {
        Self {
            id: NodeId::new(),
            body,
            x,
            y,
            text: text.into(),
        }
    }

    /// Creates a node with a specific ID.
    #[must_use]
    pub fn with_id(id: NodeId, text: impl Into<String>, body: NodeBody, x: f64, y: f64) -> Self {
        Self {
            id,
            body,
            x,
            y,
            text: text.into(),
        }
    }

    /// Returns the kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    /// Moves the node on the canvas.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Renames the node.
    pub fn rename(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        let id = NodeId::new();
        assert!(id.to_string().starts_with("node_"));
    }

    #[test]
    fn node_id_parse_roundtrip() {
        let id = NodeId::new();
        let parsed: NodeId = id.to_string().parse().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn switching_assignee_type_clears_selection() {
        let mut body = NodeBody::Approve(ApprovalRules {
            mode: ApproveMode::And,
            assignment: Assignment::FixedUsers {
                user_ids: vec![UserId::new(), UserId::new()],
            },
        });

        body.set_assignee_type(AssigneeType::FixedRoles).expect("switch");

        match body.assignment().expect("assignment") {
            Assignment::FixedRoles { role_ids } => assert!(role_ids.is_empty()),
            other => panic!("unexpected assignment: {other:?}"),
        }
        // The approval mode survives the switch.
        match &body {
            NodeBody::Approve(rules) => assert_eq!(rules.mode, ApproveMode::And),
            _ => unreachable!(),
        }
    }

    #[test]
    fn empty_of_every_type_has_no_ids() {
        for assignee_type in [
            AssigneeType::FixedUsers,
            AssigneeType::FixedRoles,
            AssigneeType::DeptAndRole,
        ] {
            let assignment = Assignment::empty_of(assignee_type);
            assert_eq!(assignment.assignee_type(), assignee_type);
            assert!(!assignment.has_selection());
        }
        for assignee_type in [
            AssigneeType::SelfSelect,
            AssigneeType::ManagerLookup,
            AssigneeType::SelfHandle,
        ] {
            assert!(Assignment::empty_of(assignee_type).has_selection());
        }
    }

    #[test]
    fn copy_node_rejects_disallowed_assignee_types() {
        let mut body = NodeBody::Copy(CopyRules::default());

        let err = body
            .set_assignee_type(AssigneeType::DeptAndRole)
            .unwrap_err();
        assert!(matches!(err, GraphError::AssigneeTypeNotAllowed { .. }));

        let err = body.set_assignee_type(AssigneeType::SelfSelect).unwrap_err();
        assert!(matches!(err, GraphError::AssigneeTypeNotAllowed { .. }));

        body.set_assignee_type(AssigneeType::FixedUsers)
            .expect("allowed");
    }

    #[test]
    fn start_node_has_no_assignees() {
        let mut body = NodeBody::Start;
        let err = body.set_assignee_type(AssigneeType::FixedUsers).unwrap_err();
        assert!(matches!(err, GraphError::NoAssignees { kind: NodeKind::Start }));
    }

    #[test]
    fn node_serializes_with_wire_shape() {
        let node = Node::new(
            "Manager approval",
            NodeBody::Approve(ApprovalRules::default()),
            120.0,
            80.0,
        );
        let json = serde_json::to_value(&node).expect("serialize");

        assert_eq!(json["type"], "approve");
        assert_eq!(json["x"], 120.0);
        assert_eq!(json["y"], 80.0);
        assert_eq!(json["text"], "Manager approval");
        assert!(json["properties"].is_object());
        assert!(json["id"].is_string());
    }

    #[test]
    fn start_node_serializes_without_properties() {
        let node = Node::new("Start", NodeBody::Start, 300.0, 100.0);
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["type"], "start");
        assert!(json.get("properties").is_none() || json["properties"].is_null());
    }

    #[test]
    fn node_serde_roundtrip() {
        let node = Node::new(
            "CC finance",
            NodeBody::Copy(CopyRules {
                assignment: Assignment::FixedRoles {
                    role_ids: vec![RoleId::new()],
                },
            }),
            10.0,
            20.0,
        );
        let json = serde_json::to_string(&node).expect("serialize");
        let parsed: Node = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(node, parsed);
    }

    #[test]
    fn approve_properties_default_for_older_documents() {
        // Older documents may lack parts of the properties object.
        let node: Node = serde_json::from_str(
            r#"{"id":"01HZXW2T4C2Q4X5Y6Z7A8B9C0D","type":"approve","properties":{},"x":1.0,"y":2.0,"text":"A"}"#,
        )
        .expect("deserialize");

        match &node.body {
            NodeBody::Approve(rules) => {
                assert_eq!(rules.mode, ApproveMode::Or);
                assert_eq!(rules.assignment, Assignment::SelfSelect);
            }
            _ => panic!("wrong body"),
        }
    }
}
