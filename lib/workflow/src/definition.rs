//! Process definition records.
//!
//! A definition is the named, versioned owner of a graph document. The graph
//! itself travels as an opaque JSON string in `process_config`; the server
//! never interprets it field by field.

use crate::error::DefinitionError;
use chrono::{DateTime, Utc};
use opsdesk_core::DefinitionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a process definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionStatus {
    /// Editable, not yet available for starting instances.
    Draft,
    /// Live; new instances may be started from it.
    Published,
    /// Retired; existing instances continue, new ones cannot start.
    Disabled,
}

impl DefinitionStatus {
    /// Returns the wire name of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for DefinitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete process definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Unique identifier for this definition.
    pub id: DefinitionId,
    /// Human-readable name.
    pub name: String,
    /// Stable key other modules bind to (e.g. `leave_apply`).
    pub process_key: String,
    /// Organizational category (e.g. HR, finance).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Description of what this process does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: DefinitionStatus,
    /// Revision counter, bumped on publish.
    pub version: u32,
    /// The serialized graph document, opaque to the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_config: Option<String>,
    /// When this definition was created.
    pub created_at: DateTime<Utc>,
    /// When this definition was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ProcessDefinition {
    /// Creates a new draft definition.
    #[must_use]
    pub fn new(name: impl Into<String>, process_key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DefinitionId::new(),
            name: name.into(),
            process_key: process_key.into(),
            category: None,
            description: None,
            status: DefinitionStatus::Draft,
            version: 0,
            process_config: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true while the definition is live.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == DefinitionStatus::Published
    }

    /// Publishes the definition, bumping its version.
    ///
    /// # Errors
    ///
    /// Returns an error when the definition is already published.
    pub fn publish(&mut self) -> Result<(), DefinitionError> {
        match self.status {
            DefinitionStatus::Draft | DefinitionStatus::Disabled => {
                self.status = DefinitionStatus::Published;
                self.version += 1;
                self.touch();
                Ok(())
            }
            DefinitionStatus::Published => Err(DefinitionError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: DefinitionStatus::Published.to_string(),
            }),
        }
    }

    /// Disables a published definition.
    ///
    /// # Errors
    ///
    /// Returns an error unless the definition is currently published.
    pub fn disable(&mut self) -> Result<(), DefinitionError> {
        match self.status {
            DefinitionStatus::Published => {
                self.status = DefinitionStatus::Disabled;
                self.touch();
                Ok(())
            }
            DefinitionStatus::Draft | DefinitionStatus::Disabled => {
                Err(DefinitionError::InvalidStatusTransition {
                    from: self.status.to_string(),
                    to: DefinitionStatus::Disabled.to_string(),
                })
            }
        }
    }

    /// Marks the definition as updated.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Summary information about a definition (for listings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSummary {
    /// Definition ID.
    pub id: DefinitionId,
    /// Definition name.
    pub name: String,
    /// Stable process key.
    pub process_key: String,
    /// Category, if any.
    pub category: Option<String>,
    /// Lifecycle status.
    pub status: DefinitionStatus,
    /// Revision counter.
    pub version: u32,
    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&ProcessDefinition> for DefinitionSummary {
    fn from(definition: &ProcessDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name.clone(),
            process_key: definition.process_key.clone(),
            category: definition.category.clone(),
            status: definition.status,
            version: definition.version,
            updated_at: definition.updated_at,
        }
    }
}
