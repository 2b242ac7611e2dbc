/// Construction options for a [`KeyedStore`](super::KeyedStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Emit a `tracing` warning when a write or subscription targets a key
    /// that was never initialized. The operation still succeeds silently.
    pub warn_on_uninitialized: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            warn_on_uninitialized: true,
        }
    }
}

impl StoreConfig {
    /// Config that drops misuse without logging.
    pub fn quiet() -> Self {
        Self {
            warn_on_uninitialized: false,
        }
    }
}
