//! Property panel field model.
//!
//! The side panel renders whatever fields apply to the selected element, and
//! which fields apply is a pure function of the element's kind and, for
//! steps with assignees, its current assignee type. This module computes
//! those field descriptors; the host UI renders them.

use crate::edge::{ConditionOperator, Edge};
use crate::node::{AssigneeType, Node, NodeBody, NodeKind, COPY_ASSIGNEE_TYPES};

/// Where a multi-select gets its options from.
///
/// The directory lookups behind these are external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    /// The user directory.
    Users,
    /// The role list.
    Roles,
    /// The department tree.
    Departments,
}

/// A fixed choice in a select control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Display label.
    pub label: &'static str,
    /// Wire value.
    pub value: &'static str,
}

/// The control a field renders as.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Single-line text input.
    Text,
    /// Number input with a lower bound.
    Number { min: u32 },
    /// Single select over fixed choices.
    Select(Vec<Choice>),
    /// Multi-select fed from a directory.
    MultiSelect(OptionSource),
    /// Read-only explanatory note.
    Note(&'static str),
}

/// One field of the property panel.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Stable key the host uses to bind the value.
    pub key: &'static str,
    /// Display label.
    pub label: &'static str,
    /// How the field renders.
    pub control: Control,
}

impl FieldSpec {
    fn new(key: &'static str, label: &'static str, control: Control) -> Self {
        Self {
            key,
            label,
            control,
        }
    }
}

/// Approval-mode choices for approve and handle nodes.
#[must_use]
pub fn approve_mode_choices() -> Vec<Choice> {
    vec![
        Choice {
            label: "Any one approver",
            value: "or",
        },
        Choice {
            label: "All approvers",
            value: "and",
        },
        Choice {
            label: "One after another",
            value: "sequential",
        },
    ]
}

/// Assignee-type choices, restricted for copy nodes.
#[must_use]
pub fn assignee_type_choices(kind: NodeKind) -> Vec<Choice> {
    let all = [
        (AssigneeType::FixedUsers, "Specific users"),
        (AssigneeType::FixedRoles, "Specific roles"),
        (AssigneeType::DeptAndRole, "Department and role"),
        (AssigneeType::SelfSelect, "Chosen by the initiator"),
        (AssigneeType::ManagerLookup, "Initiator's manager"),
        (AssigneeType::SelfHandle, "The initiator"),
    ];
    all.into_iter()
        .filter(|(assignee_type, _)| {
            kind != NodeKind::Copy || COPY_ASSIGNEE_TYPES.contains(assignee_type)
        })
        .map(|(assignee_type, label)| Choice {
            label,
            value: assignee_type.as_str(),
        })
        .collect()
}

/// Condition-operator choices for edge conditions.
#[must_use]
pub fn operator_choices() -> Vec<Choice> {
    ConditionOperator::ALL
        .into_iter()
        .map(|operator| Choice {
            label: match operator {
                ConditionOperator::Eq => "equals",
                ConditionOperator::Ne => "does not equal",
                ConditionOperator::Gt => "greater than",
                ConditionOperator::Ge => "greater than or equal",
                ConditionOperator::Lt => "less than",
                ConditionOperator::Le => "less than or equal",
                ConditionOperator::Contains => "contains",
                ConditionOperator::Empty => "is empty",
                ConditionOperator::NotEmpty => "is not empty",
            },
            value: operator.as_str(),
        })
        .collect()
}

fn assignee_fields(assignee_type: AssigneeType, noun: &'static str) -> Vec<FieldSpec> {
    match assignee_type {
        AssigneeType::FixedUsers => vec![FieldSpec::new(
            "assigneeIds",
            noun,
            Control::MultiSelect(OptionSource::Users),
        )],
        AssigneeType::FixedRoles => vec![FieldSpec::new(
            "roleIds",
            "Roles",
            Control::MultiSelect(OptionSource::Roles),
        )],
        AssigneeType::DeptAndRole => vec![
            FieldSpec::new(
                "deptIds",
                "Departments",
                Control::MultiSelect(OptionSource::Departments),
            ),
            FieldSpec::new(
                "roleIds",
                "Roles",
                Control::MultiSelect(OptionSource::Roles),
            ),
        ],
        AssigneeType::SelfSelect => vec![FieldSpec::new(
            "assigneeHint",
            "",
            Control::Note("The initiator picks assignees when starting the flow"),
        )],
        AssigneeType::ManagerLookup => vec![FieldSpec::new(
            "assigneeHint",
            "",
            Control::Note("The initiator's manager is looked up automatically"),
        )],
        AssigneeType::SelfHandle => vec![FieldSpec::new(
            "assigneeHint",
            "",
            Control::Note("The initiator handles this step themselves"),
        )],
    }
}

/// Panel fields for a node.
#[must_use]
pub fn fields_for_node(node: &Node) -> Vec<FieldSpec> {
    let mut fields = vec![FieldSpec::new("name", "Node name", Control::Text)];

    match &node.body {
        NodeBody::Start | NodeBody::End => {}
        NodeBody::Approve(rules) | NodeBody::Handle(rules) => {
            fields.push(FieldSpec::new(
                "approveType",
                "Approval mode",
                Control::Select(approve_mode_choices()),
            ));
            fields.push(FieldSpec::new(
                "assigneeType",
                "Assignee type",
                Control::Select(assignee_type_choices(node.kind())),
            ));
            fields.extend(assignee_fields(
                rules.assignment.assignee_type(),
                "Assignees",
            ));
        }
        NodeBody::Copy(rules) => {
            fields.push(FieldSpec::new(
                "assigneeType",
                "Recipient type",
                Control::Select(assignee_type_choices(NodeKind::Copy)),
            ));
            fields.extend(assignee_fields(
                rules.assignment.assignee_type(),
                "Recipients",
            ));
        }
        NodeBody::Condition => {
            fields.push(FieldSpec::new(
                "conditionHint",
                "",
                Control::Note(
                    "Conditions live on the outgoing branches; select a branch to configure one",
                ),
            ));
        }
    }

    fields
}

/// Panel fields for an edge.
#[must_use]
pub fn fields_for_edge(edge: &Edge) -> Vec<FieldSpec> {
    let mut fields = vec![FieldSpec::new(
        "isDefault",
        "Default branch",
        Control::Select(vec![
            Choice {
                label: "No, requires a condition",
                value: "false",
            },
            Choice {
                label: "Yes, taken when nothing else matches",
                value: "true",
            },
        ]),
    )];

    if !edge.properties.is_default {
        fields.push(FieldSpec::new("conditionField", "Field", Control::Text));
        fields.push(FieldSpec::new(
            "conditionOperator",
            "Operator",
            Control::Select(operator_choices()),
        ));
        fields.push(FieldSpec::new("conditionValue", "Value", Control::Text));
    }

    fields.push(FieldSpec::new(
        "priority",
        "Priority",
        Control::Number { min: 1 },
    ));
    fields
}
