//! Notification sinks composed over the event channel.
//!
//! Each sink is an independent consumer: a badge counter, a tab-title
//! flasher, a sound alert, and a permission-gated desktop notification.
//! They are wired onto the channel individually and must not interfere with
//! one another; the dispatch loop already isolates a slow or panicking sink
//! from the rest.

use crate::channel::EventChannel;
use crate::counters::UnreadCounters;
use crate::event::{EventKind, PushEvent};
use crate::registry::SubscriptionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A consumer of push events.
pub trait NotificationSink: Send + Sync {
    /// Handles one event.
    fn deliver(&self, event: &PushEvent);
}

/// Subscribes a sink to the given event kinds.
///
/// Returns the subscription handles so the caller can detach the sink on
/// teardown.
pub fn attach_sink(
    channel: &EventChannel,
    kinds: &[EventKind],
    sink: Arc<dyn NotificationSink>,
) -> Vec<SubscriptionId> {
    kinds
        .iter()
        .map(|kind| {
            let sink = Arc::clone(&sink);
            channel.on(kind.clone(), move |event| sink.deliver(event))
        })
        .collect()
}

/// Returns the screen an event of this kind should navigate to.
#[must_use]
pub fn route_for(kind: &EventKind) -> Option<&'static str> {
    match kind {
        EventKind::NewMessage | EventKind::UnreadUpdate => Some("/messages"),
        EventKind::NewAnnouncement => Some("/announcements"),
        EventKind::NewTodo => Some("/workflow/todo"),
        EventKind::NewWorkflowTask | EventKind::WorkflowStatusUpdate => Some("/workflow/tasks"),
        _ => None,
    }
}

/// Returns a short human title for an event of this kind.
#[must_use]
pub fn title_for(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::NewMessage => "New message",
        EventKind::NewAnnouncement => "New announcement",
        EventKind::NewTodo => "New todo",
        EventKind::NewWorkflowTask => "New approval task",
        EventKind::WorkflowStatusUpdate => "Workflow update",
        _ => "Notification",
    }
}

/// Applies incoming counter updates to an [`UnreadCounters`] store.
pub struct BadgeSink {
    counters: Arc<UnreadCounters>,
}

impl BadgeSink {
    /// Creates a badge sink over the shared counter store.
    #[must_use]
    pub fn new(counters: Arc<UnreadCounters>) -> Self {
        Self { counters }
    }
}

impl NotificationSink for BadgeSink {
    fn deliver(&self, event: &PushEvent) {
        self.counters.apply(event);
    }
}

/// Flashes the tab title while the tab is hidden.
///
/// The host UI drives this: it reports visibility changes with
/// [`TitleFlasher::set_visible`] and renders whatever [`TitleFlasher::tick`]
/// returns on its blink timer. Regaining visibility stops the flash and
/// restores the base title.
pub struct TitleFlasher {
    base: String,
    alert: Mutex<Option<&'static str>>,
    visible: AtomicBool,
    phase: AtomicBool,
}

impl TitleFlasher {
    /// Creates a flasher around the given base title; the tab starts visible.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            alert: Mutex::new(None),
            visible: AtomicBool::new(true),
            phase: AtomicBool::new(false),
        }
    }

    /// Reports a visibility change. Becoming visible clears the flash.
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
        if visible {
            *self.alert.lock().expect("title lock poisoned") = None;
            self.phase.store(false, Ordering::SeqCst);
        }
    }

    /// Returns true while a flash is armed.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        self.alert.lock().expect("title lock poisoned").is_some()
    }

    /// Advances the blink and returns the title to display.
    pub fn tick(&self) -> String {
        let alert = *self.alert.lock().expect("title lock poisoned");
        match alert {
            Some(alert) => {
                let phase = self.phase.fetch_xor(true, Ordering::SeqCst);
                if phase {
                    self.base.clone()
                } else {
                    format!("[{alert}] {}", self.base)
                }
            }
            None => self.base.clone(),
        }
    }
}

impl NotificationSink for TitleFlasher {
    fn deliver(&self, event: &PushEvent) {
        if self.visible.load(Ordering::SeqCst) {
            return;
        }
        *self.alert.lock().expect("title lock poisoned") = Some(title_for(&event.kind));
    }
}

/// Plays an alert sound through a host-supplied callback.
pub struct SoundSink {
    player: Box<dyn Fn() + Send + Sync>,
}

impl SoundSink {
    /// Creates a sound sink with the given playback callback.
    #[must_use]
    pub fn new(player: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            player: Box::new(player),
        }
    }
}

impl NotificationSink for SoundSink {
    fn deliver(&self, _event: &PushEvent) {
        (self.player)();
    }
}

/// Desktop notification permission as granted by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// The user has not decided yet.
    Default,
    /// Notifications may be shown.
    Granted,
    /// Notifications are blocked.
    Denied,
}

/// A desktop notification ready for the host to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Screen to navigate to when clicked.
    pub route: Option<&'static str>,
}

/// Host integration for desktop notifications.
pub trait DesktopNotifier: Send + Sync {
    /// Current notification permission.
    fn permission(&self) -> NotificationPermission;

    /// Shows a notification.
    fn show(&self, notification: &DesktopNotification);
}

/// Raises desktop notifications for events, gated on permission.
pub struct DesktopSink {
    notifier: Arc<dyn DesktopNotifier>,
}

impl DesktopSink {
    /// Creates a desktop sink over the host notifier.
    #[must_use]
    pub fn new(notifier: Arc<dyn DesktopNotifier>) -> Self {
        Self { notifier }
    }
}

impl NotificationSink for DesktopSink {
    fn deliver(&self, event: &PushEvent) {
        if self.notifier.permission() != NotificationPermission::Granted {
            return;
        }
        let notification = DesktopNotification {
            title: title_for(&event.kind).to_string(),
            body: event.message.clone().unwrap_or_default(),
            route: route_for(&event.kind),
        };
        self.notifier.show(&notification);
    }
}
