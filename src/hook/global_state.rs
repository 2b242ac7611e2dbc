use std::fmt;
use std::rc::Rc;

use crate::store::KeyedStore;

use super::{KeySource, SyncExternalStoreHost};

/// Writes to one key of a [`KeyedStore`].
///
/// Every clone writes to the same key; each write notifies every consumer
/// of that key.
pub struct Setter<V> {
    store: KeyedStore<V>,
    key: Rc<str>,
}

impl<V> Setter<V> {
    pub(crate) fn new(store: KeyedStore<V>, key: Rc<str>) -> Self {
        Self { store, key }
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: V) {
        self.store.set_state(&self.key, value);
    }

    /// Derive the next value from the current one and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&V) -> V) {
        self.store.update_state(&self.key, f);
    }

    /// The key this setter writes to.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<V> Clone for Setter<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: Rc::clone(&self.key),
        }
    }
}

impl<V> fmt::Debug for Setter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("key", &self.key).finish()
    }
}

/// Read shared state under `key` from inside a component render.
///
/// The key is initialized with `initial` the first time any consumer asks
/// for it; later calls keep the existing value. The host subscribes the
/// component to the key, so any write through any [`Setter`] for the same
/// key schedules a re-render of every consumer.
///
/// # Examples
///
/// ```
/// use keyed_state::{use_global_state, KeyedStore, RenderScope};
///
/// let store = KeyedStore::new();
/// let mut counter = RenderScope::new();
///
/// let (count, set_count) = counter.render(|cx| use_global_state(cx, &store, "count", 0));
/// assert_eq!(*count, 0);
///
/// set_count.set(5);
/// assert!(counter.needs_render());
///
/// let (count, _) = counter.render(|cx| use_global_state(cx, &store, "count", 0));
/// assert_eq!(*count, 5);
/// ```
pub fn use_global_state<H, V>(
    host: &mut H,
    store: &KeyedStore<V>,
    key: &str,
    initial: V,
) -> (Rc<V>, Setter<V>)
where
    H: SyncExternalStoreHost,
{
    let source = KeySource::bind(store, key, initial);
    let value = host.use_sync_external_store(&source);
    (value, source.setter())
}
