use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use super::{ExternalStore, SourceId};
use crate::store::{Listener, Unsubscribe};

/// The rendering layer's side of the external-store contract.
///
/// Implementations must call [`ExternalStore::subscribe`] at most once per
/// hook slot while the component stays mounted and the slot keeps the same
/// [`ExternalStore::source_id`]. When a slot's source changes, the old
/// subscription is released and the new source subscribed. They must also call
/// [`ExternalStore::get_snapshot`] on every render, and schedule a re-render
/// when the change callback fires.
pub trait SyncExternalStoreHost {
    fn use_sync_external_store<S>(&mut self, source: &S) -> S::Snapshot
    where
        S: ExternalStore;
}

/// A minimal host modelling one mounted component.
///
/// Hook calls are matched to slots by their position within a render pass.
/// A slot whose source differs from the previous render is resubscribed, and
/// slots a render no longer reaches are released when the render ends. A
/// change notification on any slot marks the scope as needing a render.
/// Dropping the scope unmounts it.
#[derive(Debug)]
pub struct RenderScope {
    slots: Vec<Slot>,
    cursor: usize,
    invalidated: Rc<Cell<bool>>,
    notifications: Rc<Cell<u64>>,
    renders: u64,
}

#[derive(Debug)]
struct Slot {
    source: SourceId,
    unsubscribe: Unsubscribe,
}

impl RenderScope {
    /// Create an unmounted scope with no subscriptions.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            invalidated: Rc::new(Cell::new(false)),
            notifications: Rc::new(Cell::new(0)),
            renders: 0,
        }
    }

    /// Run one render pass.
    pub fn render<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.cursor = 0;
        self.invalidated.set(false);
        self.renders += 1;
        let output = f(self);
        self.release_from(self.cursor);
        output
    }

    /// Whether a subscribed value changed since the last render started.
    pub fn needs_render(&self) -> bool {
        self.invalidated.get()
    }

    /// Number of render passes run so far.
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Change notifications received over the scope's lifetime.
    pub fn notification_count(&self) -> u64 {
        self.notifications.get()
    }

    /// Number of live subscriptions held by this scope.
    pub fn subscription_count(&self) -> usize {
        self.slots.len()
    }

    /// Release every subscription. A later render subscribes again.
    pub fn unmount(&mut self) {
        self.release_from(0);
        self.cursor = 0;
    }

    fn release_from(&mut self, start: usize) {
        if start >= self.slots.len() {
            return;
        }
        for slot in self.slots.drain(start..) {
            slot.unsubscribe.unsubscribe();
        }
        trace!(kept = start, "hook slots released");
    }

    fn change_callback(&self) -> Listener {
        let invalidated = Rc::clone(&self.invalidated);
        let notifications = Rc::clone(&self.notifications);
        Rc::new(move || {
            invalidated.set(true);
            notifications.set(notifications.get() + 1);
        })
    }
}

impl Default for RenderScope {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncExternalStoreHost for RenderScope {
    fn use_sync_external_store<S>(&mut self, source: &S) -> S::Snapshot
    where
        S: ExternalStore,
    {
        let slot = self.cursor;
        let id = source.source_id();
        match self.slots.get(slot) {
            Some(existing) if existing.source == id => {}
            Some(existing) => {
                existing.unsubscribe.unsubscribe();
                // One callback per slot; slots on the same key unsubscribe independently.
                let unsubscribe = source.subscribe(self.change_callback());
                self.slots[slot] = Slot {
                    source: id,
                    unsubscribe,
                };
                trace!(slot, "hook slot resubscribed to a new source");
            }
            None => {
                let unsubscribe = source.subscribe(self.change_callback());
                self.slots.push(Slot {
                    source: id,
                    unsubscribe,
                });
                trace!(slot, "hook slot subscribed");
            }
        }
        self.cursor += 1;
        source.get_snapshot()
    }
}

impl Drop for RenderScope {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{use_global_state, KeySource};
    use crate::KeyedStore;

    #[test]
    fn subscribes_once_across_renders() {
        let store = KeyedStore::new();
        let source = KeySource::bind(&store, "k", 0);
        let mut scope = RenderScope::new();

        for _ in 0..3 {
            scope.render(|cx| cx.use_sync_external_store(&source));
        }

        assert_eq!(scope.render_count(), 3);
        assert_eq!(scope.subscription_count(), 1);
        assert_eq!(store.listener_count("k"), 1);
    }

    #[test]
    fn notification_invalidates_until_next_render() {
        let store = KeyedStore::new();
        let source = KeySource::bind(&store, "k", 0);
        let mut scope = RenderScope::new();
        scope.render(|cx| cx.use_sync_external_store(&source));
        assert!(!scope.needs_render());

        store.set_state("k", 1);
        store.set_state("k", 2);
        assert!(scope.needs_render());
        assert_eq!(scope.notification_count(), 2);

        let value = scope.render(|cx| cx.use_sync_external_store(&source));
        assert_eq!(*value, 2);
        assert!(!scope.needs_render());
    }

    #[test]
    fn two_slots_on_one_key() {
        let store = KeyedStore::new();
        let source = KeySource::bind(&store, "k", 0);
        let mut scope = RenderScope::new();

        scope.render(|cx| {
            cx.use_sync_external_store(&source);
            cx.use_sync_external_store(&source);
        });
        assert_eq!(store.listener_count("k"), 2);

        scope.unmount();
        assert_eq!(store.listener_count("k"), 0);
    }

    #[test]
    fn drop_unmounts() {
        let store = KeyedStore::new();
        let source = KeySource::bind(&store, "k", 0);
        {
            let mut scope = RenderScope::new();
            scope.render(|cx| cx.use_sync_external_store(&source));
            assert_eq!(store.listener_count("k"), 1);
        }
        assert_eq!(store.listener_count("k"), 0);
        // The entry itself outlives its last consumer.
        assert!(store.contains_key("k"));
    }

    #[test]
    fn slot_follows_key_change() {
        let store = KeyedStore::new();
        let mut scope = RenderScope::new();

        let (a, _) = scope.render(|cx| use_global_state(cx, &store, "a", 1));
        assert_eq!(*a, 1);
        let (b, set_b) = scope.render(|cx| use_global_state(cx, &store, "b", 10));
        assert_eq!(*b, 10);

        assert_eq!(store.listener_count("a"), 0);
        assert_eq!(store.listener_count("b"), 1);
        assert_eq!(scope.subscription_count(), 1);

        store.set_state("a", 5);
        assert!(!scope.needs_render());

        set_b.set(11);
        assert!(scope.needs_render());
        let (b, _) = scope.render(|cx| use_global_state(cx, &store, "b", 10));
        assert_eq!(*b, 11);
    }

    #[test]
    fn same_key_across_renders_keeps_subscription() {
        let store = KeyedStore::new();
        let mut scope = RenderScope::new();

        scope.render(|cx| use_global_state(cx, &store, "k", 0));
        let before = scope.notification_count();
        scope.render(|cx| use_global_state(cx, &store, "k", 0));

        assert_eq!(store.listener_count("k"), 1);
        store.set_state("k", 1);
        assert_eq!(scope.notification_count(), before + 1);
    }

    #[test]
    fn fewer_hooks_release_trailing_slots() {
        let store = KeyedStore::new();
        let mut scope = RenderScope::new();

        scope.render(|cx| {
            use_global_state(cx, &store, "first", 0);
            use_global_state(cx, &store, "second", 0);
        });
        assert_eq!(scope.subscription_count(), 2);

        scope.render(|cx| {
            use_global_state(cx, &store, "first", 0);
        });
        assert_eq!(scope.subscription_count(), 1);
        assert_eq!(store.listener_count("first"), 1);
        assert_eq!(store.listener_count("second"), 0);

        store.set_state("second", 3);
        assert!(!scope.needs_render());
        store.set_state("first", 3);
        assert!(scope.needs_render());
    }
}
