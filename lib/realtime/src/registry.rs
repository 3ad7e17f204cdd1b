//! Listener registry and dispatch fan-out.
//!
//! Multiple independent UI surfaces subscribe to the subset of events they
//! care about. Dispatch iterates over a snapshot of the listener set, so a
//! handler may register or remove listeners (including itself) without
//! corrupting the in-progress iteration, and a panicking handler never
//! prevents delivery to the rest.

use crate::event::{EventKind, PushEvent};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use ulid::Ulid;

/// Handle returned by [`ListenerRegistry::on`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Ulid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Ulid::new())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

type Handler = Arc<dyn Fn(&PushEvent) + Send + Sync>;

/// Mapping from event kind to registered listeners.
///
/// Each subscription is delivered at most once per event. Listeners under
/// the catch-all kind ([`EventKind::catch_all`]) additionally receive every
/// event of any other kind, without double delivery for catch-all events
/// themselves.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<HashMap<EventKind, Vec<(SubscriptionId, Handler)>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the given kind and returns its handle.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&PushEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId::new();
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes a listener. Returns true if it was registered.
    ///
    /// Removing an already-removed listener is a no-op.
    pub fn off(&self, kind: &EventKind, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        let Some(entries) = listeners.get_mut(kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            listeners.remove(kind);
        }
        removed
    }

    /// Returns the number of listeners registered for a kind.
    #[must_use]
    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .get(kind)
            .map_or(0, Vec::len)
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .clear();
    }

    /// Dispatches one event to its listeners and the catch-all bucket.
    ///
    /// The listener set is snapshotted before any handler runs; handlers
    /// registered during dispatch see only subsequent events, and handlers
    /// removed during dispatch still receive this one. A panicking handler is
    /// logged and skipped.
    pub fn dispatch(&self, event: &PushEvent) {
        let snapshot: Vec<(SubscriptionId, Handler)> = {
            let listeners = self.listeners.lock().expect("listener lock poisoned");
            let mut collected = listeners.get(&event.kind).cloned().unwrap_or_default();
            let catch_all = EventKind::catch_all();
            if event.kind != catch_all {
                if let Some(extra) = listeners.get(&catch_all) {
                    collected.extend(extra.iter().cloned());
                }
            }
            collected
        };

        for (id, handler) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(subscription = %id, kind = %event.kind, "listener panicked during dispatch");
            }
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        let counts: HashMap<&EventKind, usize> =
            listeners.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> impl Fn(&PushEvent) + Send + Sync {
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn typed_listener_receives_matching_events_only() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.on(EventKind::NewTodo, counting_handler(Arc::clone(&hits)));

        registry.dispatch(&PushEvent::new(EventKind::NewTodo));
        registry.dispatch(&PushEvent::new(EventKind::NewMessage));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn catch_all_receives_every_kind_without_double_delivery() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.on(EventKind::catch_all(), counting_handler(Arc::clone(&hits)));

        registry.dispatch(&PushEvent::new(EventKind::NewTodo));
        registry.dispatch(&PushEvent::new(EventKind::NewMessage));
        // A catch-all event must not be delivered twice to the same listener.
        registry.dispatch(&PushEvent::new(EventKind::Message));

        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn typed_and_catch_all_both_fire_for_one_event() {
        let registry = ListenerRegistry::new();
        let typed = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));
        registry.on(EventKind::NewTodo, counting_handler(Arc::clone(&typed)));
        registry.on(EventKind::catch_all(), counting_handler(Arc::clone(&all)));

        let event = PushEvent::decode(r#"{"type":"new_todo","pendingTodoCount":5}"#).unwrap();
        registry.dispatch(&event);

        assert_eq!(typed.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_receives_nothing() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = registry.on(EventKind::NewMessage, counting_handler(Arc::clone(&hits)));

        assert!(registry.off(&EventKind::NewMessage, id));
        // Removing again is a no-op.
        assert!(!registry.off(&EventKind::NewMessage, id));

        registry.dispatch(&PushEvent::new(EventKind::NewMessage));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.on(EventKind::NewMessage, |_| panic!("boom"));
        registry.on(EventKind::NewMessage, counting_handler(Arc::clone(&hits)));
        registry.on(EventKind::catch_all(), counting_handler(Arc::clone(&hits)));

        registry.dispatch(&PushEvent::new(EventKind::NewMessage));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_may_unregister_itself_during_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let registry_for_handler = Arc::clone(&registry);
        let hits_for_handler = Arc::clone(&hits);
        let id_cell: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let id_for_handler = Arc::clone(&id_cell);

        let id = registry.on(EventKind::NewTodo, move |_| {
            hits_for_handler.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_for_handler.lock().unwrap() {
                registry_for_handler.off(&EventKind::NewTodo, id);
            }
        });
        *id_cell.lock().unwrap() = Some(id);

        registry.dispatch(&PushEvent::new(EventKind::NewTodo));
        registry.dispatch(&PushEvent::new(EventKind::NewTodo));

        // Fired once, then removed itself.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.listener_count(&EventKind::NewTodo), 0);
    }

    #[test]
    fn listener_registered_during_dispatch_misses_current_event() {
        let registry = Arc::new(ListenerRegistry::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let registry_for_handler = Arc::clone(&registry);
        let late_for_handler = Arc::clone(&late_hits);
        registry.on(EventKind::NewTodo, move |_| {
            let late = Arc::clone(&late_for_handler);
            registry_for_handler.on(EventKind::NewTodo, move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        registry.dispatch(&PushEvent::new(EventKind::NewTodo));
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        registry.dispatch(&PushEvent::new(EventKind::NewTodo));
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }
}
