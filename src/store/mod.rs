//! Keyed observable state.
//!
//! A [`KeyedStore`] maps string keys to shared values. Each key carries its
//! own listener set; writing a key notifies only that key's listeners.

mod config;
mod listener;
mod store;

pub use config::StoreConfig;
pub use listener::{Listener, Unsubscribe};
pub(crate) use store::Entry;
pub use store::KeyedStore;
