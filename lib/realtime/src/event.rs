//! Push event types and the frame payload.
//!
//! The server pushes one JSON object per frame. Each frame declares a `type`
//! and may carry a message, an opaque data object, and updated unread
//! counters. Unrecognized types are preserved so new server-side events fan
//! out to catch-all listeners without a client update.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// The declared type of a push event.
///
/// `Message` is the catch-all bucket: listeners registered under it receive
/// every event regardless of type. `Pong` is the keep-alive acknowledgement
/// and is swallowed by the channel, never dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// A new internal message arrived.
    NewMessage,
    /// A new announcement was published.
    NewAnnouncement,
    /// A new todo item was created.
    NewTodo,
    /// A workflow task was created for the current user.
    NewWorkflowTask,
    /// A workflow instance changed state.
    WorkflowStatusUpdate,
    /// Unread counters changed (e.g. after marking messages read elsewhere).
    UnreadUpdate,
    /// Keep-alive acknowledgement.
    Pong,
    /// The generic bucket; also the catch-all subscription key.
    Message,
    /// Any type this client does not recognize.
    Other(String),
}

impl EventKind {
    /// The catch-all kind, used both as the default for untyped frames and
    /// as the subscription key that receives every event.
    #[must_use]
    pub fn catch_all() -> Self {
        Self::Message
    }

    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewMessage => "new_message",
            Self::NewAnnouncement => "new_announcement",
            Self::NewTodo => "new_todo",
            Self::NewWorkflowTask => "new_workflow_task",
            Self::WorkflowStatusUpdate => "workflow_status_update",
            Self::UnreadUpdate => "unread_update",
            Self::Pong => "pong",
            Self::Message => "message",
            Self::Other(name) => name,
        }
    }

    /// Returns true for the keep-alive acknowledgement frame.
    #[must_use]
    pub fn is_keep_alive(&self) -> bool {
        matches!(self, Self::Pong)
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "new_message" => Self::NewMessage,
            "new_announcement" => Self::NewAnnouncement,
            "new_todo" => Self::NewTodo,
            "new_workflow_task" => Self::NewWorkflowTask,
            "workflow_status_update" => Self::WorkflowStatusUpdate,
            "unread_update" => Self::UnreadUpdate,
            "pong" => Self::Pong,
            "message" => Self::Message,
            _ => Self::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single push event as delivered over the wire.
///
/// Counter fields use the server's camelCase names. A frame without a `type`
/// field decodes as the catch-all kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    /// The declared event type.
    #[serde(rename = "type", default = "EventKind::catch_all")]
    pub kind: EventKind,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Optional event-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    /// Updated unread internal-message count.
    #[serde(rename = "unreadCount", default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
    /// Updated unread announcement count.
    #[serde(
        rename = "unreadAnnouncementCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unread_announcement_count: Option<u32>,
    /// Updated pending todo count.
    #[serde(
        rename = "pendingTodoCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pending_todo_count: Option<u32>,
}

impl PushEvent {
    /// Creates an event of the given kind with no payload.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            message: None,
            data: None,
            unread_count: None,
            unread_announcement_count: None,
            pending_todo_count: None,
        }
    }

    /// Sets the message text.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the data payload.
    #[must_use]
    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    /// Decodes a single frame.
    ///
    /// # Errors
    ///
    /// Returns a decode error for frames that are not a JSON object of the
    /// expected shape. The channel drops such frames and keeps reading.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Encodes this event as a single frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_roundtrip() {
        for name in [
            "new_message",
            "new_announcement",
            "new_todo",
            "new_workflow_task",
            "workflow_status_update",
            "unread_update",
            "pong",
            "message",
        ] {
            let kind = EventKind::from(name.to_string());
            assert_eq!(kind.as_str(), name);
            assert!(!matches!(kind, EventKind::Other(_)));
        }
    }

    #[test]
    fn unknown_kind_preserved() {
        let kind = EventKind::from("server_maintenance".to_string());
        assert_eq!(kind, EventKind::Other("server_maintenance".to_string()));
        assert_eq!(kind.as_str(), "server_maintenance");
    }

    #[test]
    fn decode_typical_frame() {
        let event =
            PushEvent::decode(r#"{"type":"new_todo","pendingTodoCount":5}"#).expect("decode");
        assert_eq!(event.kind, EventKind::NewTodo);
        assert_eq!(event.pending_todo_count, Some(5));
        assert!(event.message.is_none());
    }

    #[test]
    fn decode_untyped_frame_as_catch_all() {
        let event = PushEvent::decode(r#"{"message":"hello"}"#).expect("decode");
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.message.as_deref(), Some("hello"));
    }

    #[test]
    fn decode_rejects_malformed_frame() {
        assert!(PushEvent::decode("not json").is_err());
        assert!(PushEvent::decode(r#"["array"]"#).is_err());
    }

    #[test]
    fn encode_decode_roundtrip_with_unknown_kind() {
        let event = PushEvent::new(EventKind::Other("custom_event".to_string()))
            .with_message("payload")
            .with_data(serde_json::json!({"k": 1}));
        let raw = event.encode().expect("encode");
        let parsed = PushEvent::decode(&raw).expect("decode");
        assert_eq!(event, parsed);
    }

    #[test]
    fn counters_use_camel_case_wire_names() {
        let mut event = PushEvent::new(EventKind::UnreadUpdate);
        event.unread_count = Some(3);
        event.unread_announcement_count = Some(2);
        let raw = event.encode().expect("encode");
        assert!(raw.contains("\"unreadCount\":3"));
        assert!(raw.contains("\"unreadAnnouncementCount\":2"));
        assert!(!raw.contains("pendingTodoCount"));
    }

    #[test]
    fn pong_is_keep_alive() {
        assert!(EventKind::Pong.is_keep_alive());
        assert!(!EventKind::NewMessage.is_keep_alive());
    }
}
