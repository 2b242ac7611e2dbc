use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::store::{Entry, KeyedStore, Listener, Unsubscribe};

use super::Setter;

/// Identity of an observable source, used by hosts to tell whether a hook
/// slot still reads the same source as on the previous render.
///
/// Holds a weak reference, so the address cannot be reused while any copy
/// of the id is alive.
#[derive(Clone)]
pub struct SourceId(Weak<dyn Any>);

impl SourceId {
    /// Identity of the allocation behind `rc`.
    pub fn of<T: 'static>(rc: &Rc<T>) -> Self {
        let erased: Rc<dyn Any> = Rc::clone(rc) as Rc<dyn Any>;
        Self(Rc::downgrade(&erased))
    }
}

impl PartialEq for SourceId {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SourceId {}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceId").finish_non_exhaustive()
    }
}

/// A value that lives outside the rendering layer and can be observed.
///
/// `get_snapshot` must be cheap and side-effect free, and must return an
/// equal (ideally pointer-equal) value while nothing has changed.
/// `source_id` must be equal for two sources exactly when subscribing to
/// either reaches the same listeners.
pub trait ExternalStore {
    type Snapshot;

    /// Identity of the underlying source.
    fn source_id(&self) -> SourceId;

    /// Register `on_change`; it is called after every change.
    fn subscribe(&self, on_change: Listener) -> Unsubscribe;

    /// Read the current value.
    fn get_snapshot(&self) -> Self::Snapshot;
}

/// One key of a [`KeyedStore`], bound as an [`ExternalStore`].
///
/// Binding initializes the key, so a snapshot is always available.
pub struct KeySource<V> {
    store: KeyedStore<V>,
    key: Rc<str>,
    entry: Rc<Entry<V>>,
}

impl<V> KeySource<V> {
    /// Initialize `key` with `initial` (first value wins) and bind it.
    pub fn bind(store: &KeyedStore<V>, key: &str, initial: V) -> Self {
        let (entry, _) = store.insert_if_absent(key, initial);
        Self {
            store: store.clone(),
            key: Rc::from(key),
            entry,
        }
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// A setter writing to the bound key.
    pub fn setter(&self) -> Setter<V> {
        Setter::new(self.store.clone(), Rc::clone(&self.key))
    }
}

impl<V> ExternalStore for KeySource<V> {
    type Snapshot = Rc<V>;

    fn source_id(&self) -> SourceId {
        self.entry.source_id()
    }

    fn subscribe(&self, on_change: Listener) -> Unsubscribe {
        self.store.subscribe(&self.key, on_change)
    }

    fn get_snapshot(&self) -> Rc<V> {
        self.entry.snapshot()
    }
}

impl<V> Clone for KeySource<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: Rc::clone(&self.key),
            entry: Rc::clone(&self.entry),
        }
    }
}

impl<V> fmt::Debug for KeySource<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySource").field("key", &self.key).finish_non_exhaustive()
    }
}
