use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

/// A zero-argument change callback.
///
/// Listeners are compared by reference identity: two clones of the same
/// `Rc` are the same listener, two separately allocated closures are not.
pub type Listener = Rc<dyn Fn()>;

fn listener_addr(listener: &Listener) -> usize {
    Rc::as_ptr(listener) as *const () as usize
}

/// Identifies one registration in a [`ListenerSet`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ListenerId(u64);

/// The listeners registered under one key, without duplicates.
///
/// Registrations are ordered by id, which is registration order. Lookups
/// by id and by listener address are logarithmic or better.
#[derive(Default)]
pub(crate) struct ListenerSet {
    next_id: u64,
    by_id: BTreeMap<ListenerId, Listener>,
    by_addr: HashMap<usize, ListenerId>,
}

impl ListenerSet {
    /// Add a listener and return its id. A listener already present keeps
    /// its existing id.
    pub(crate) fn insert(&mut self, listener: Listener) -> ListenerId {
        let addr = listener_addr(&listener);
        if let Some(id) = self.by_addr.get(&addr) {
            return *id;
        }
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.by_addr.insert(addr, id);
        self.by_id.insert(id, listener);
        id
    }

    /// Remove a registration. Returns the listener if it was present.
    pub(crate) fn remove(&mut self, id: ListenerId) -> Option<Listener> {
        let listener = self.by_id.remove(&id)?;
        self.by_addr.remove(&listener_addr(&listener));
        Some(listener)
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Copy of the current membership, used to fan out without holding a borrow.
    pub(crate) fn snapshot(&self) -> Vec<(ListenerId, Listener)> {
        self.by_id
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect()
    }
}

#[derive(Clone)]
struct Registration {
    key: Rc<str>,
    listeners: Weak<RefCell<ListenerSet>>,
    id: ListenerId,
}

/// Handle returned by [`KeyedStore::subscribe`](super::KeyedStore::subscribe).
///
/// Calling [`unsubscribe`](Unsubscribe::unsubscribe) removes exactly the
/// registration this handle was created for. It is idempotent, and clones of
/// the handle all refer to the same registration. Dropping the handle does
/// not unsubscribe. The handle does not keep the listener alive.
#[derive(Clone)]
pub struct Unsubscribe {
    registration: Option<Registration>,
}

impl Unsubscribe {
    pub(crate) fn new(key: &str, listeners: &Rc<RefCell<ListenerSet>>, id: ListenerId) -> Self {
        Self {
            registration: Some(Registration {
                key: Rc::from(key),
                listeners: Rc::downgrade(listeners),
                id,
            }),
        }
    }

    /// A handle that does nothing when invoked.
    pub fn noop() -> Self {
        Self { registration: None }
    }

    /// Whether this handle was issued for a key that did not exist.
    pub fn is_noop(&self) -> bool {
        self.registration.is_none()
    }

    /// Remove the listener from its key.
    pub fn unsubscribe(&self) {
        let Some(registration) = &self.registration else {
            return;
        };
        let Some(listeners) = registration.listeners.upgrade() else {
            return;
        };
        let removed = listeners.borrow_mut().remove(registration.id);
        if let Some(listener) = removed {
            trace!(key = %registration.key, "listener unsubscribed");
            // Released outside the borrow; its captures may touch the store.
            drop(listener);
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.registration {
            Some(registration) => f
                .debug_struct("Unsubscribe")
                .field("key", &registration.key)
                .field("id", &registration.id)
                .finish_non_exhaustive(),
            None => f.write_str("Unsubscribe(noop)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener() -> Listener {
        Rc::new(|| {})
    }

    #[test]
    fn set_dedupes_by_identity() {
        let mut set = ListenerSet::default();
        let a = listener();
        let b = listener();

        let a_id = set.insert(a.clone());
        assert_eq!(set.insert(a.clone()), a_id);
        let b_id = set.insert(b.clone());
        assert_ne!(a_id, b_id);
        assert_eq!(set.len(), 2);

        assert!(set.remove(a_id).is_some());
        assert!(set.remove(a_id).is_none());
        assert!(set.contains(b_id));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reinserted_listener_gets_fresh_id() {
        let mut set = ListenerSet::default();
        let a = listener();

        let first = set.insert(a.clone());
        set.remove(first);
        let second = set.insert(a);

        assert_ne!(first, second);
        assert!(!set.contains(first));
        assert!(set.contains(second));
    }

    #[test]
    fn snapshot_in_registration_order() {
        let mut set = ListenerSet::default();
        let ids: Vec<ListenerId> = (0..5).map(|_| set.insert(listener())).collect();
        set.remove(ids[2]);

        let order: Vec<ListenerId> = set.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![ids[0], ids[1], ids[3], ids[4]]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let set = Rc::new(RefCell::new(ListenerSet::default()));
        let a_id = set.borrow_mut().insert(listener());
        let b_id = set.borrow_mut().insert(listener());

        let handle = Unsubscribe::new("k", &set, a_id);
        handle.unsubscribe();
        handle.clone().unsubscribe();

        assert!(!set.borrow().contains(a_id));
        assert!(set.borrow().contains(b_id));
    }

    #[test]
    fn unsubscribe_releases_listener_captures() {
        let captured = Rc::new(());
        let set = Rc::new(RefCell::new(ListenerSet::default()));
        let id = {
            let captured = captured.clone();
            set.borrow_mut().insert(Rc::new(move || {
                let _alive = &captured;
            }))
        };
        let handle = Unsubscribe::new("k", &set, id);
        assert_eq!(Rc::strong_count(&captured), 2);

        handle.unsubscribe();
        assert_eq!(Rc::strong_count(&captured), 1);
    }

    #[test]
    fn unsubscribe_after_set_dropped() {
        let set = Rc::new(RefCell::new(ListenerSet::default()));
        let id = set.borrow_mut().insert(listener());
        let handle = Unsubscribe::new("k", &set, id);
        drop(set);

        handle.unsubscribe();
    }

    #[test]
    fn noop_handle() {
        let handle = Unsubscribe::noop();
        assert!(handle.is_noop());
        handle.unsubscribe();
        handle.unsubscribe();
    }
}
