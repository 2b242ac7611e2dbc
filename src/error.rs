//! Error types for the strict store operations.
//!
//! The default store operations never fail: writing to or subscribing on a
//! key that was never initialized is silently dropped. The `try_*` variants
//! on [`KeyedStore`](crate::KeyedStore) report those cases instead.

use thiserror::Error;

/// Errors returned by the strict store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key has no entry; it was never passed to `initialize`.
    #[error("key `{key}` has not been initialized")]
    Uninitialized { key: String },
}

impl StoreError {
    pub(crate) fn uninitialized(key: &str) -> Self {
        Self::Uninitialized {
            key: key.to_owned(),
        }
    }
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, StoreError>;
