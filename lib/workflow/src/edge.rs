//! Edge types for process graphs.
//!
//! Edges connect two nodes and, for branches leaving a condition node, carry
//! a condition expression: a form field compared against a value. One edge
//! per branch point may be flagged as the default (fallback) branch, and
//! `priority` orders evaluation among the rest; lower evaluates first.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// A unique identifier for an edge within a process graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(Ulid);

impl EdgeId {
    /// Creates a new random edge ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates an edge ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge_{}", self.0)
    }
}

impl FromStr for EdgeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("edge_").unwrap_or(s);
        Ulid::from_str(raw).map(Self)
    }
}

/// Comparison operator of a condition expression.
///
/// The serialized names are the operator symbols the form engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// Equal.
    #[serde(rename = "==")]
    Eq,
    /// Not equal.
    #[serde(rename = "!=")]
    Ne,
    /// Greater than.
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    Ge,
    /// Less than.
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Le,
    /// Substring / member containment.
    #[serde(rename = "contains")]
    Contains,
    /// Field is empty.
    #[serde(rename = "empty")]
    Empty,
    /// Field is not empty.
    #[serde(rename = "notEmpty")]
    NotEmpty,
}

impl ConditionOperator {
    /// Every operator, in the order the panel presents them.
    pub const ALL: [Self; 9] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Ge,
        Self::Lt,
        Self::Le,
        Self::Contains,
        Self::Empty,
        Self::NotEmpty,
    ];

    /// Returns the wire symbol of this operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Contains => "contains",
            Self::Empty => "empty",
            Self::NotEmpty => "notEmpty",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operator symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperatorError {
    /// The rejected symbol.
    pub symbol: String,
}

impl fmt::Display for ParseOperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown condition operator: {}", self.symbol)
    }
}

impl std::error::Error for ParseOperatorError {}

impl FromStr for ConditionOperator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ParseOperatorError {
                symbol: s.to_string(),
            })
    }
}

/// A complete condition expression: field, operator, comparison value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// The form field to evaluate (e.g. `days`, `amount`).
    pub field: String,
    /// The comparison operator.
    pub operator: ConditionOperator,
    /// The value to compare against.
    pub value: String,
}

impl Condition {
    /// Creates a condition expression.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

fn default_priority() -> u32 {
    1
}

/// Authoring properties of an edge.
///
/// The condition parts are individually optional so documents written before
/// a field existed still load; [`EdgeProperties::condition`] reassembles the
/// triple when all parts are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeProperties {
    /// Fallback branch taken when no conditional sibling matches.
    #[serde(default)]
    pub is_default: bool,
    /// The form field a condition evaluates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_field: Option<String>,
    /// The condition's comparison operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_operator: Option<ConditionOperator>,
    /// The condition's comparison value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_value: Option<String>,
    /// Evaluation order among conditional siblings; lower evaluates first.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

impl Default for EdgeProperties {
    fn default() -> Self {
        Self {
            is_default: false,
            condition_field: None,
            condition_operator: None,
            condition_value: None,
            priority: default_priority(),
        }
    }
}

impl EdgeProperties {
    /// Properties for the fallback branch of a condition node.
    #[must_use]
    pub fn default_branch() -> Self {
        Self {
            is_default: true,
            ..Self::default()
        }
    }

    /// Properties carrying a condition expression.
    #[must_use]
    pub fn conditional(condition: Condition, priority: u32) -> Self {
        Self {
            is_default: false,
            condition_field: Some(condition.field),
            condition_operator: Some(condition.operator),
            condition_value: Some(condition.value),
            priority,
        }
    }

    /// Returns the condition triple when every part is present.
    #[must_use]
    pub fn condition(&self) -> Option<Condition> {
        Some(Condition {
            field: self.condition_field.clone()?,
            operator: self.condition_operator?,
            value: self.condition_value.clone()?,
        })
    }

    /// Sets the condition triple.
    pub fn set_condition(&mut self, condition: Condition) {
        self.condition_field = Some(condition.field);
        self.condition_operator = Some(condition.operator);
        self.condition_value = Some(condition.value);
    }

    /// Removes the condition triple.
    pub fn clear_condition(&mut self) {
        self.condition_field = None;
        self.condition_operator = None;
        self.condition_value = None;
    }
}

/// An edge between two nodes of a process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identifier, stable for the life of the document.
    pub id: EdgeId,
    /// The node this edge leaves.
    pub source_node_id: NodeId,
    /// The node this edge enters.
    pub target_node_id: NodeId,
    /// Authoring properties.
    #[serde(default)]
    pub properties: EdgeProperties,
}

impl Edge {
    /// Creates an edge with default properties.
    #[must_use]
    pub fn new(source_node_id: NodeId, target_node_id: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            source_node_id,
            target_node_id,
            properties: EdgeProperties::default(),
        }
    }

    /// Creates an edge with the given properties.
    #[must_use]
    pub fn with_properties(
        source_node_id: NodeId,
        target_node_id: NodeId,
        properties: EdgeProperties,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            source_node_id,
            target_node_id,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_symbols_roundtrip() {
        for op in ConditionOperator::ALL {
            let parsed: ConditionOperator = op.as_str().parse().expect("parse");
            assert_eq!(op, parsed);
        }
    }

    #[test]
    fn operator_parse_rejects_unknown_symbol() {
        let err = "~=".parse::<ConditionOperator>().unwrap_err();
        assert!(err.to_string().contains("~="));
    }

    #[test]
    fn operator_serde_uses_symbols() {
        let json = serde_json::to_string(&ConditionOperator::Ge).expect("serialize");
        assert_eq!(json, "\">=\"");
        let json = serde_json::to_string(&ConditionOperator::NotEmpty).expect("serialize");
        assert_eq!(json, "\"notEmpty\"");
    }

    #[test]
    fn edge_properties_default_from_empty_object() {
        let properties: EdgeProperties = serde_json::from_str("{}").expect("deserialize");
        assert!(!properties.is_default);
        assert_eq!(properties.priority, 1);
        assert!(properties.condition().is_none());
    }

    #[test]
    fn partial_condition_is_not_a_triple() {
        let mut properties = EdgeProperties::default();
        properties.condition_field = Some("days".to_string());
        properties.condition_operator = Some(ConditionOperator::Ge);
        assert!(properties.condition().is_none());

        properties.condition_value = Some("3".to_string());
        let condition = properties.condition().expect("triple");
        assert_eq!(condition.to_string(), "days >= 3");
    }

    #[test]
    fn conditional_constructor_carries_triple() {
        let properties = EdgeProperties::conditional(
            Condition::new("amount", ConditionOperator::Gt, "1000"),
            2,
        );
        assert!(!properties.is_default);
        assert_eq!(properties.priority, 2);
        assert_eq!(
            properties.condition().expect("triple").to_string(),
            "amount > 1000"
        );
    }

    #[test]
    fn edge_serializes_with_wire_names() {
        let edge = Edge::new(NodeId::new(), NodeId::new());
        let json = serde_json::to_value(&edge).expect("serialize");
        assert!(json["sourceNodeId"].is_string());
        assert!(json["targetNodeId"].is_string());
        assert_eq!(json["properties"]["isDefault"], false);
        assert_eq!(json["properties"]["priority"], 1);
    }

    #[test]
    fn edge_serde_roundtrip() {
        let edge = Edge::with_properties(
            NodeId::new(),
            NodeId::new(),
            EdgeProperties::conditional(Condition::new("days", ConditionOperator::Lt, "3"), 1),
        );
        let json = serde_json::to_string(&edge).expect("serialize");
        let parsed: Edge = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(edge, parsed);
    }
}
