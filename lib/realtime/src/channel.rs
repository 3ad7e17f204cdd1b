//! The push event channel and its connection lifecycle.
//!
//! One channel exists per authenticated session. It owns every timer it
//! creates (heartbeat, reconnect) and tears all of them down on
//! [`EventChannel::disconnect`], so no timer can outlive the channel.
//!
//! Reconnection backs off linearly (`base_delay × attempt`, capped) up to a
//! bounded attempt count, re-checking the credential store before every
//! attempt so a logout stops reconnection immediately. A successful open
//! resets the attempt counter; an explicit disconnect pins it to the
//! maximum so a stray close event cannot revive the connection.

use crate::event::{EventKind, PushEvent};
use crate::registry::{ListenerRegistry, SubscriptionId};
use crate::transport::{Transport, TransportLink};
use opsdesk_core::CredentialSource;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The keep-alive frame sent on every heartbeat tick.
const KEEP_ALIVE_FRAME: &str = "ping";

/// Channel tuning parameters.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Push endpoint URL.
    pub url: String,
    /// Interval between keep-alive frames.
    pub heartbeat_interval: Duration,
    /// Base reconnect delay; attempt N waits `base × N`, capped below.
    pub reconnect_base_delay: Duration,
    /// Upper bound on the reconnect delay.
    pub reconnect_delay_cap: Duration,
    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
}

impl ChannelConfig {
    /// Creates a config for the given URL with the default timings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_base_delay: Duration::from_secs(2),
            reconnect_delay_cap: Duration::from_secs(30),
            max_reconnect_attempts: 10,
        }
    }
}

/// Transport state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Never connected.
    Idle,
    /// A connect attempt is in flight.
    Connecting,
    /// Link established; events flow.
    Open,
    /// Link closed (by the server, an error, or a disconnect).
    Closed,
}

/// Mutable connection bookkeeping behind the channel's lock.
struct ConnState {
    state: ChannelState,
    attempts: u32,
    /// Bumped on disconnect; in-flight tasks from an older generation bail.
    generation: u64,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl ConnState {
    fn new() -> Self {
        Self {
            state: ChannelState::Idle,
            attempts: 0,
            generation: 0,
            outgoing: None,
            reader: None,
            heartbeat: None,
            reconnect: None,
        }
    }
}

struct Shared {
    config: ChannelConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialSource>,
    registry: ListenerRegistry,
    conn: Mutex<ConnState>,
}

/// The realtime push channel.
///
/// Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct EventChannel {
    shared: Arc<Shared>,
}

impl EventChannel {
    /// Creates a channel over the given transport and credential store.
    #[must_use]
    pub fn new(
        config: ChannelConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                credentials,
                registry: ListenerRegistry::new(),
                conn: Mutex::new(ConnState::new()),
            }),
        }
    }

    /// Opens the connection.
    ///
    /// No-op when already open or connecting, and when no session credential
    /// is available.
    pub fn connect(&self) {
        let mut conn = self.lock_conn();
        if matches!(conn.state, ChannelState::Open | ChannelState::Connecting) {
            tracing::debug!("already connected or connecting");
            return;
        }
        let Some(token) = self.shared.credentials.token() else {
            tracing::debug!("no session credential; not connecting");
            return;
        };
        conn.state = ChannelState::Connecting;
        let generation = conn.generation;
        drop(conn);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            Shared::run_connect(shared, token, generation).await;
        });
    }

    /// Closes the connection and cancels every pending timer.
    ///
    /// Safe to call in any state. The reconnect counter is pinned to its
    /// maximum so a stray close event cannot schedule a reconnect.
    pub fn disconnect(&self) {
        let mut conn = self.lock_conn();
        conn.generation += 1;
        if let Some(handle) = conn.reconnect.take() {
            handle.abort();
        }
        if let Some(handle) = conn.heartbeat.take() {
            handle.abort();
        }
        if let Some(handle) = conn.reader.take() {
            handle.abort();
        }
        conn.outgoing = None;
        conn.state = ChannelState::Closed;
        conn.attempts = self.shared.config.max_reconnect_attempts;
        tracing::info!("push channel disconnected");
    }

    /// Registers a listener; see [`ListenerRegistry::on`].
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&PushEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.registry.on(kind, handler)
    }

    /// Removes a listener; see [`ListenerRegistry::off`].
    pub fn off(&self, kind: &EventKind, id: SubscriptionId) -> bool {
        self.shared.registry.off(kind, id)
    }

    /// Returns the current transport state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.lock_conn().state
    }

    /// Returns true while the link is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Re-arms the reconnect counter for a manual retry.
    pub fn reset_reconnect(&self) {
        self.lock_conn().attempts = 0;
    }

    /// Sends a raw frame, best-effort.
    pub fn send(&self, frame: impl Into<String>) {
        let conn = self.lock_conn();
        match &conn.outgoing {
            Some(outgoing) => {
                if outgoing.send(frame.into()).is_err() {
                    tracing::warn!("push channel link gone; frame dropped");
                }
            }
            None => tracing::warn!("push channel not connected; frame dropped"),
        }
    }

    fn lock_conn(&self) -> MutexGuard<'_, ConnState> {
        self.shared.conn.lock().expect("channel lock poisoned")
    }
}

impl Shared {
    fn lock_conn(self: &Arc<Self>) -> MutexGuard<'_, ConnState> {
        self.conn.lock().expect("channel lock poisoned")
    }

    async fn run_connect(shared: Arc<Self>, token: String, generation: u64) {
        match shared.transport.open(&shared.config.url, &token).await {
            Ok(link) => Self::on_open(&shared, link, generation),
            Err(e) => {
                tracing::warn!(error = %e, "push channel connect failed");
                let mut conn = shared.lock_conn();
                if conn.generation != generation {
                    return;
                }
                conn.state = ChannelState::Closed;
                Self::schedule_reconnect(&shared, &mut conn, generation);
            }
        }
    }

    fn on_open(shared: &Arc<Self>, link: TransportLink, generation: u64) {
        let TransportLink { outgoing, incoming } = link;
        let mut conn = shared.lock_conn();
        if conn.generation != generation {
            // Disconnected while the handshake was in flight; dropping the
            // sender closes the fresh link.
            return;
        }
        conn.state = ChannelState::Open;
        conn.attempts = 0;
        conn.outgoing = Some(outgoing.clone());
        conn.heartbeat = Some(tokio::spawn(Self::heartbeat_loop(
            outgoing,
            shared.config.heartbeat_interval,
        )));
        conn.reader = Some(tokio::spawn(Self::read_loop(
            Arc::clone(shared),
            incoming,
            generation,
        )));
        tracing::info!("push channel connected");
    }

    async fn heartbeat_loop(outgoing: mpsc::UnboundedSender<String>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if outgoing.send(KEEP_ALIVE_FRAME.to_string()).is_err() {
                break;
            }
        }
    }

    async fn read_loop(
        shared: Arc<Self>,
        mut incoming: mpsc::UnboundedReceiver<String>,
        generation: u64,
    ) {
        while let Some(frame) = incoming.recv().await {
            Self::handle_frame(&shared, &frame);
        }

        // The link closed underneath us.
        let mut conn = shared.lock_conn();
        if conn.generation != generation {
            return;
        }
        conn.state = ChannelState::Closed;
        conn.outgoing = None;
        if let Some(handle) = conn.heartbeat.take() {
            handle.abort();
        }
        tracing::warn!("push channel closed");
        Self::schedule_reconnect(&shared, &mut conn, generation);
    }

    fn handle_frame(shared: &Arc<Self>, frame: &str) {
        let event = match PushEvent::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                // Malformed input must never take the channel down.
                tracing::warn!(error = %e, frame, "dropping malformed push frame");
                return;
            }
        };
        if event.kind.is_keep_alive() {
            tracing::trace!("keep-alive acknowledged");
            return;
        }
        shared.registry.dispatch(&event);
    }

    fn schedule_reconnect(shared: &Arc<Self>, conn: &mut ConnState, generation: u64) {
        if conn.attempts >= shared.config.max_reconnect_attempts {
            tracing::info!(
                attempts = conn.attempts,
                "reconnect limit reached; giving up"
            );
            return;
        }
        if shared.credentials.token().is_none() {
            tracing::info!("credential cleared; not reconnecting");
            return;
        }

        conn.attempts += 1;
        let attempt = conn.attempts;
        let delay = shared
            .config
            .reconnect_base_delay
            .saturating_mul(attempt)
            .min(shared.config.reconnect_delay_cap);
        tracing::info!(attempt, ?delay, "scheduling reconnect");

        let shared_for_task = Arc::clone(shared);
        conn.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let token = {
                let mut conn = shared_for_task.lock_conn();
                if conn.generation != generation {
                    return;
                }
                if matches!(conn.state, ChannelState::Open | ChannelState::Connecting) {
                    return;
                }
                let Some(token) = shared_for_task.credentials.token() else {
                    tracing::info!("credential cleared; reconnect abandoned");
                    return;
                };
                conn.state = ChannelState::Connecting;
                token
            };

            Self::run_connect(shared_for_task, token, generation).await;
        }));
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let conn = self.lock_conn();
        f.debug_struct("EventChannel")
            .field("url", &self.shared.config.url)
            .field("state", &conn.state)
            .field("attempts", &conn.attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use opsdesk_core::SharedCredential;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory transport with scripted connect outcomes and probes for the
    /// most recent link.
    struct MockTransport {
        opens: AtomicU32,
        fail_all: bool,
        probe: Mutex<Option<LinkProbe>>,
    }

    struct LinkProbe {
        incoming_tx: mpsc::UnboundedSender<String>,
        outgoing_rx: mpsc::UnboundedReceiver<String>,
    }

    impl MockTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                opens: AtomicU32::new(0),
                fail_all: false,
                probe: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                opens: AtomicU32::new(0),
                fail_all: true,
                probe: Mutex::new(None),
            })
        }

        fn open_count(&self) -> u32 {
            self.opens.load(Ordering::SeqCst)
        }

        fn push_frame(&self, frame: &str) {
            let probe = self.probe.lock().unwrap();
            let probe = probe.as_ref().expect("no open link");
            probe.incoming_tx.send(frame.to_string()).expect("push");
        }

        fn close_link(&self) {
            *self.probe.lock().unwrap() = None;
        }

        fn drain_sent(&self) -> Vec<String> {
            let mut probe = self.probe.lock().unwrap();
            let probe = probe.as_mut().expect("no open link");
            let mut frames = Vec::new();
            while let Ok(frame) = probe.outgoing_rx.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self, _url: &str, _token: &str) -> Result<TransportLink, TransportError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail_all {
                return Err(TransportError::ConnectFailed {
                    message: "scripted failure".to_string(),
                });
            }
            let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
            let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
            *self.probe.lock().unwrap() = Some(LinkProbe {
                incoming_tx,
                outgoing_rx,
            });
            Ok(TransportLink {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
            })
        }
    }

    fn test_config() -> ChannelConfig {
        let mut config = ChannelConfig::new("wss://example.test/push");
        config.heartbeat_interval = Duration::from_secs(5);
        config.reconnect_base_delay = Duration::from_millis(100);
        config.reconnect_delay_cap = Duration::from_millis(400);
        config.max_reconnect_attempts = 3;
        config
    }

    async fn settle() {
        // Let spawned connect/read tasks run (virtual time is paused).
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn connect_without_credential_is_noop() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::new(),
        );

        channel.connect();
        settle().await;

        assert_eq!(transport.open_count(), 0);
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_is_idempotent() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        channel.connect();
        channel.connect();
        settle().await;
        channel.connect();
        settle().await;

        assert_eq!(transport.open_count(), 1);
        assert!(channel.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn frames_dispatch_to_listeners() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        let seen: Arc<Mutex<Vec<PushEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_for_handler = Arc::clone(&seen);
        channel.on(EventKind::NewTodo, move |event| {
            seen_for_handler.lock().unwrap().push(event.clone());
        });

        channel.connect();
        settle().await;
        transport.push_frame(r#"{"type":"new_todo","pendingTodoCount":5}"#);
        settle().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].pending_todo_count, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_and_keep_alive_frames_are_swallowed() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        let hits = Arc::new(AtomicU32::new(0));
        let hits_for_handler = Arc::clone(&hits);
        channel.on(EventKind::catch_all(), move |_| {
            hits_for_handler.fetch_add(1, Ordering::SeqCst);
        });

        channel.connect();
        settle().await;
        transport.push_frame("definitely not json");
        transport.push_frame(r#"{"type":"pong"}"#);
        transport.push_frame(r#"{"type":"new_message","unreadCount":2}"#);
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(channel.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_unexpected_close() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        channel.connect();
        settle().await;
        assert_eq!(transport.open_count(), 1);

        transport.close_link();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(transport.open_count(), 2);
        assert!(channel.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        channel.connect();
        settle().await;
        transport.close_link();
        settle().await;
        channel.disconnect();

        // Well past every possible backoff window.
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.open_count(), 1);
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let transport = MockTransport::failing();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        channel.connect();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // Initial attempt plus max_reconnect_attempts retries.
        assert_eq!(transport.open_count(), 4);
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_credential_stops_reconnect() {
        let transport = MockTransport::new();
        let credentials = SharedCredential::with_token("tok");
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&credentials) as Arc<dyn CredentialSource>,
        );

        channel.connect();
        settle().await;
        credentials.clear();
        transport.close_link();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_counter_resets_after_successful_open() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        channel.connect();
        settle().await;

        // Exhaust more closes than max_reconnect_attempts would allow from a
        // single open; each successful reopen resets the counter.
        for _ in 0..5 {
            transport.close_link();
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(channel.is_connected());
        }
        assert_eq!(transport.open_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_sends_keep_alive_frames() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::with_token("tok"),
        );

        channel.connect();
        settle().await;
        tokio::time::sleep(Duration::from_secs(12)).await;

        let pings = transport
            .drain_sent()
            .into_iter()
            .filter(|frame| frame.as_str() == KEEP_ALIVE_FRAME)
            .count();
        assert!(pings >= 2, "expected at least two keep-alive frames, got {pings}");
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_safe_when_never_connected() {
        let transport = MockTransport::new();
        let channel = EventChannel::new(
            test_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            SharedCredential::new(),
        );

        channel.disconnect();
        assert_eq!(channel.state(), ChannelState::Closed);
    }
}
