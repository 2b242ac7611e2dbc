//! # Keyed State
//!
//! Shared, keyed observable state for UI components.
//!
//! The crate has two layers:
//!
//! ## Store
//!
//! A [`KeyedStore<V>`] maps string keys to values, each with its own set of
//! listeners:
//! - `initialize` creates a key once; the first initial value wins
//! - `get_snapshot` reads the current value without side effects
//! - `subscribe` registers a listener and returns an [`Unsubscribe`] handle
//! - `set_state` replaces the value and synchronously notifies listeners
//!
//! Writes and subscriptions to keys that were never initialized are dropped
//! silently (with a `tracing` warning); the `try_*` variants report them as
//! [`StoreError`] instead.
//!
//! ## Hook
//!
//! [`use_global_state`] binds a key to a rendering layer through the
//! [`SyncExternalStoreHost`] contract and returns the current value paired
//! with a [`Setter`]. [`RenderScope`] is a small host that models one
//! mounted component.

pub mod error;
pub mod hook;
pub mod store;

// Re-export main types for convenience
pub use error::{Result, StoreError};
pub use hook::{
    use_global_state, ExternalStore, KeySource, RenderScope, Setter, SourceId,
    SyncExternalStoreHost,
};
pub use store::{KeyedStore, Listener, StoreConfig, Unsubscribe};
