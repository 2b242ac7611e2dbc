//! Binding keyed state to a rendering layer.
//!
//! A rendering layer implements [`SyncExternalStoreHost`]: given any
//! [`ExternalStore`] it subscribes once per hook slot, reads the snapshot on
//! every render and schedules a re-render when notified. [`use_global_state`]
//! wires one key of a [`KeyedStore`](crate::KeyedStore) into that contract.

mod global_state;
mod host;
mod source;

pub use global_state::{use_global_state, Setter};
pub use host::{RenderScope, SyncExternalStoreHost};
pub use source::{ExternalStore, KeySource, SourceId};
