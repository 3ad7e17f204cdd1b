//! Realtime push channel and notification dispatch for the opsdesk platform.
//!
//! This crate provides the client side of the server-push pipeline:
//!
//! - **Event Channel**: a persistent connection with reconnect/backoff and a
//!   periodic keep-alive heartbeat
//! - **Listener Registry**: typed event fan-out with a catch-all bucket and
//!   per-handler isolation
//! - **Unread Counters**: an observable store for badge counts
//! - **Notification Sinks**: badge, title flash, sound, and desktop
//!   notification consumers composed over the channel

pub mod channel;
pub mod counters;
pub mod event;
pub mod notify;
pub mod registry;
pub mod transport;

pub use channel::{ChannelConfig, ChannelState, EventChannel};
pub use counters::UnreadCounters;
pub use event::{EventKind, PushEvent};
pub use notify::{
    BadgeSink, DesktopNotification, DesktopNotifier, DesktopSink, NotificationPermission,
    NotificationSink, SoundSink, TitleFlasher, attach_sink,
};
pub use registry::{ListenerRegistry, SubscriptionId};
pub use transport::{Transport, TransportError, TransportLink, WebSocketTransport};
