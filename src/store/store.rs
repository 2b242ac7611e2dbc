use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use super::config::StoreConfig;
use super::listener::{Listener, ListenerSet, Unsubscribe};
use crate::error::{Result, StoreError};
use crate::hook::SourceId;

/// The value and listeners stored under one key.
pub(crate) struct Entry<V> {
    value: RefCell<Rc<V>>,
    listeners: Rc<RefCell<ListenerSet>>,
}

impl<V> Entry<V> {
    fn new(initial: V) -> Self {
        Self {
            value: RefCell::new(Rc::new(initial)),
            listeners: Rc::new(RefCell::new(ListenerSet::default())),
        }
    }

    /// Current value. Pointer-equal across calls until the next write.
    pub(crate) fn snapshot(&self) -> Rc<V> {
        Rc::clone(&self.value.borrow())
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Identity of this entry, stable for as long as the store holds it.
    pub(crate) fn source_id(&self) -> SourceId {
        SourceId::of(&self.listeners)
    }
}

/// A registry of shared values keyed by string.
///
/// Each key holds one value and a set of listeners. Writing a key replaces
/// its value and synchronously calls every listener registered for that key.
/// Entries are created on first [`initialize`](KeyedStore::initialize) and
/// live as long as the store.
///
/// Cloning a `KeyedStore` creates a new handle to the **same** registry.
/// The store is single-threaded; listeners run on the caller's stack with no
/// internal borrow held, so they may read, write, subscribe or unsubscribe.
pub struct KeyedStore<V> {
    entries: Rc<RefCell<HashMap<String, Rc<Entry<V>>>>>,
    config: StoreConfig,
}

impl<V> KeyedStore<V> {
    /// Create an empty store with the default config.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with the given config.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
            config,
        }
    }

    /// The options this store was created with.
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    fn entry(&self, key: &str) -> Option<Rc<Entry<V>>> {
        self.entries.borrow().get(key).cloned()
    }

    /// Look up `key`, creating it with `initial` if absent.
    ///
    /// The flag is `true` when this call created the entry.
    pub(crate) fn insert_if_absent(&self, key: &str, initial: V) -> (Rc<Entry<V>>, bool) {
        if let Some(entry) = self.entry(key) {
            return (entry, false);
        }
        let entry = Rc::new(Entry::new(initial));
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), Rc::clone(&entry));
        trace!(key, "entry created");
        (entry, true)
    }

    /// Create the entry for `key` with `initial` if it does not exist yet.
    ///
    /// The first initial value wins: on an existing key this is a no-op and
    /// `initial` is dropped. Returns whether the entry was created.
    pub fn initialize(&self, key: &str, initial: V) -> bool {
        self.insert_if_absent(key, initial).1
    }

    /// Register `listener` to be called after every write to `key`.
    ///
    /// If `key` was never initialized nothing is registered and a no-op
    /// handle is returned.
    pub fn subscribe(&self, key: &str, listener: Listener) -> Unsubscribe {
        match self.entry(key) {
            Some(entry) => Self::attach(key, &entry, listener),
            None => {
                self.report_uninitialized(key, "subscribe");
                Unsubscribe::noop()
            }
        }
    }

    /// Like [`subscribe`](Self::subscribe), but fails on an uninitialized key.
    pub fn try_subscribe(&self, key: &str, listener: Listener) -> Result<Unsubscribe> {
        let entry = self
            .entry(key)
            .ok_or_else(|| StoreError::uninitialized(key))?;
        Ok(Self::attach(key, &entry, listener))
    }

    fn attach(key: &str, entry: &Entry<V>, listener: Listener) -> Unsubscribe {
        let (id, count) = {
            let mut listeners = entry.listeners.borrow_mut();
            let id = listeners.insert(listener);
            (id, listeners.len())
        };
        trace!(key, listeners = count, "listener subscribed");
        Unsubscribe::new(key, &entry.listeners, id)
    }

    /// Current value of `key`, or `None` if it was never initialized.
    ///
    /// Consecutive snapshots with no write in between are pointer-equal.
    pub fn get_snapshot(&self, key: &str) -> Option<Rc<V>> {
        self.entry(key).map(|entry| entry.snapshot())
    }

    /// Read the value of `key` by reference.
    pub fn with<R>(&self, key: &str, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.get_snapshot(key).map(|value| f(value.as_ref()))
    }

    /// Replace the value of `key` and notify its listeners.
    ///
    /// Listeners registered at the moment of the call are each called once.
    /// One added during the fan-out waits for the next write; one removed
    /// before its turn is skipped. Writing to an uninitialized key is dropped.
    pub fn set_state(&self, key: &str, value: V) {
        match self.entry(key) {
            Some(entry) => Self::publish(key, &entry, value),
            None => self.report_uninitialized(key, "set_state"),
        }
    }

    /// Like [`set_state`](Self::set_state), but fails on an uninitialized key.
    pub fn try_set_state(&self, key: &str, value: V) -> Result<()> {
        let entry = self
            .entry(key)
            .ok_or_else(|| StoreError::uninitialized(key))?;
        Self::publish(key, &entry, value);
        Ok(())
    }

    /// Compute the next value of `key` from the current one, then write it
    /// as [`set_state`](Self::set_state) does.
    pub fn update_state(&self, key: &str, f: impl FnOnce(&V) -> V) {
        match self.entry(key) {
            Some(entry) => {
                let current = entry.snapshot();
                let next = f(current.as_ref());
                Self::publish(key, &entry, next);
            }
            None => self.report_uninitialized(key, "update_state"),
        }
    }

    fn publish(key: &str, entry: &Entry<V>, value: V) {
        let previous = entry.value.replace(Rc::new(value));
        drop(previous);

        let pending = entry.listeners.borrow().snapshot();
        trace!(key, listeners = pending.len(), "notifying listeners");
        for (id, listener) in pending {
            let live = entry.listeners.borrow().contains(id);
            if live {
                listener();
            }
        }
    }

    fn report_uninitialized(&self, key: &str, operation: &'static str) {
        if self.config.warn_on_uninitialized {
            warn!(key, operation, "key was never initialized; ignoring");
        }
    }

    /// Whether `key` has been initialized.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Number of listeners registered under `key` (0 for unknown keys).
    pub fn listener_count(&self, key: &str) -> usize {
        self.entry(key).map_or(0, |entry| entry.listener_count())
    }

    /// Number of initialized keys.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no key has been initialized yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All initialized keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl<V: Clone> KeyedStore<V> {
    /// Get a clone of the value of `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.with(key, V::clone)
    }
}

impl<V> Default for KeyedStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for KeyedStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            config: self.config,
        }
    }
}

impl<V> fmt::Debug for KeyedStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let listeners: HashMap<&str, usize> = entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry.listener_count()))
            .collect();
        f.debug_struct("KeyedStore")
            .field("listeners", &listeners)
            .field("config", &self.config)
            .finish()
    }
}
