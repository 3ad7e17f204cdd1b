//! Observable unread-counter store.
//!
//! Badge counts arrive piggybacked on push events and are read from several
//! unrelated widgets. Rather than a module-global variable, the counts live
//! in one shared store with watch semantics: last write wins and every
//! subscriber observes the latest value.

use crate::event::PushEvent;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Shared unread counters for the three badge surfaces.
#[derive(Debug)]
pub struct UnreadCounters {
    messages: watch::Sender<u32>,
    announcements: watch::Sender<u32>,
    todos: watch::Sender<u32>,
}

impl UnreadCounters {
    /// Creates a store with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        let (messages, _) = watch::channel(0);
        let (announcements, _) = watch::channel(0);
        let (todos, _) = watch::channel(0);
        Self {
            messages,
            announcements,
            todos,
        }
    }

    /// Applies whichever counters the event carries.
    pub fn apply(&self, event: &PushEvent) {
        if let Some(count) = event.unread_count {
            self.messages.send_replace(count);
        }
        if let Some(count) = event.unread_announcement_count {
            self.announcements.send_replace(count);
        }
        if let Some(count) = event.pending_todo_count {
            self.todos.send_replace(count);
        }
    }

    /// Sets the unread message count directly (e.g. after an initial fetch).
    pub fn set_messages(&self, count: u32) {
        self.messages.send_replace(count);
    }

    /// Sets the unread announcement count directly.
    pub fn set_announcements(&self, count: u32) {
        self.announcements.send_replace(count);
    }

    /// Sets the pending todo count directly.
    pub fn set_todos(&self, count: u32) {
        self.todos.send_replace(count);
    }

    /// Current unread message count.
    #[must_use]
    pub fn messages(&self) -> u32 {
        *self.messages.borrow()
    }

    /// Current unread announcement count.
    #[must_use]
    pub fn announcements(&self) -> u32 {
        *self.announcements.borrow()
    }

    /// Current pending todo count.
    #[must_use]
    pub fn todos(&self) -> u32 {
        *self.todos.borrow()
    }

    /// Subscribes to unread message count changes.
    #[must_use]
    pub fn watch_messages(&self) -> watch::Receiver<u32> {
        self.messages.subscribe()
    }

    /// Subscribes to unread announcement count changes.
    #[must_use]
    pub fn watch_announcements(&self) -> watch::Receiver<u32> {
        self.announcements.subscribe()
    }

    /// Subscribes to pending todo count changes.
    #[must_use]
    pub fn watch_todos(&self) -> watch::Receiver<u32> {
        self.todos.subscribe()
    }

    /// Unread message count changes as a stream.
    #[must_use]
    pub fn messages_stream(&self) -> WatchStream<u32> {
        WatchStream::new(self.messages.subscribe())
    }
}

impl Default for UnreadCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn starts_at_zero() {
        let counters = UnreadCounters::new();
        assert_eq!(counters.messages(), 0);
        assert_eq!(counters.announcements(), 0);
        assert_eq!(counters.todos(), 0);
    }

    #[test]
    fn apply_updates_only_present_counters() {
        let counters = UnreadCounters::new();
        counters.set_todos(7);

        let mut event = PushEvent::new(EventKind::NewMessage);
        event.unread_count = Some(3);
        counters.apply(&event);

        assert_eq!(counters.messages(), 3);
        assert_eq!(counters.todos(), 7);
    }

    #[test]
    fn last_write_wins() {
        let counters = UnreadCounters::new();
        counters.set_messages(5);
        counters.set_messages(2);
        assert_eq!(counters.messages(), 2);
    }

    #[tokio::test]
    async fn subscribers_observe_latest_value() {
        let counters = UnreadCounters::new();
        let mut rx = counters.watch_messages();

        counters.set_messages(4);
        rx.changed().await.expect("sender alive");
        assert_eq!(*rx.borrow(), 4);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_notified() {
        let counters = UnreadCounters::new();
        let mut rx1 = counters.watch_todos();
        let mut rx2 = counters.watch_todos();

        counters.set_todos(9);
        rx1.changed().await.expect("sender alive");
        rx2.changed().await.expect("sender alive");
        assert_eq!(*rx1.borrow(), 9);
        assert_eq!(*rx2.borrow(), 9);
    }
}
