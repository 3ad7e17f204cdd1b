//! Headless console for the opsdesk realtime channel.
//!
//! Connects to the push endpoint, wires the standard notification sinks,
//! and logs incoming events until interrupted. Useful for watching a
//! backend's push traffic without a browser session.

mod config;

use config::ConsoleConfig;
use opsdesk_core::SharedCredential;
use opsdesk_realtime::{
    BadgeSink, ChannelConfig, EventChannel, EventKind, NotificationSink, UnreadCounters,
    WebSocketTransport, attach_sink,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs every event it receives.
struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, event: &opsdesk_realtime::PushEvent) {
        tracing::info!(
            kind = %event.kind,
            message = event.message.as_deref().unwrap_or(""),
            "push event"
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ConsoleConfig::from_env().expect("failed to load configuration");
    tracing::info!(push_url = %config.push_url, "loaded configuration");

    let credentials = match &config.token {
        Some(token) => SharedCredential::with_token(token.clone()),
        None => SharedCredential::new(),
    };

    let mut channel_config = ChannelConfig::new(config.push_url.clone());
    channel_config.heartbeat_interval = Duration::from_secs(config.heartbeat_seconds);
    channel_config.reconnect_base_delay = Duration::from_secs(config.reconnect.base_delay_seconds);
    channel_config.reconnect_delay_cap = Duration::from_secs(config.reconnect.delay_cap_seconds);
    channel_config.max_reconnect_attempts = config.reconnect.max_attempts;

    let channel = EventChannel::new(
        channel_config,
        Arc::new(WebSocketTransport::new()),
        credentials,
    );

    let counters = Arc::new(UnreadCounters::new());
    attach_sink(
        &channel,
        &[
            EventKind::NewMessage,
            EventKind::NewAnnouncement,
            EventKind::NewTodo,
            EventKind::UnreadUpdate,
        ],
        Arc::new(BadgeSink::new(Arc::clone(&counters))),
    );
    attach_sink(&channel, &[EventKind::catch_all()], Arc::new(LogSink));

    // Log badge changes as they land.
    let mut unread = counters.watch_messages();
    tokio::spawn(async move {
        while unread.changed().await.is_ok() {
            tracing::info!(unread = *unread.borrow(), "unread messages");
        }
    });

    channel.connect();
    tracing::info!("watching push events; press ctrl-c to exit");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");

    channel.disconnect();
    tracing::info!("bye");
}
