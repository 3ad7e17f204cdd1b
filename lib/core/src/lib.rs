//! Core domain types and utilities for the opsdesk platform.
//!
//! This crate provides the foundational types shared by the realtime and
//! workflow crates: strongly-typed identifiers, the REST response envelope,
//! and the client-side credential store.

pub mod auth;
pub mod envelope;
pub mod id;

pub use auth::{CredentialSource, SharedCredential};
pub use envelope::{ApiError, ApiResponse};
pub use id::{
    AnnouncementId, DefinitionId, DeptId, InstanceId, MessageId, RoleId, TaskId, UserId,
};
