//! Namespaced key-value storage for Parchi.
//!
//! Everything the app persists locally — the license state, ledger
//! preferences, cached display identity — goes through the [`KvStore`]
//! trait: string keys, opaque string values, last-writer-wins
//! full-value replacement. There are no partial updates and no
//! optimistic concurrency control; only one execution context is
//! expected to hold the store at a time.
//!
//! Two implementations are provided:
//! - [`MemoryStore`] for tests and as the reference semantics
//! - [`FileStore`] backed by a single JSON document in the platform
//!   data directory

mod error;
mod file;
mod memory;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// A namespaced string key-value store.
pub trait KvStore: Send + Sync {
    /// Returns the value for `key`, or `None` if absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Sets `key` to `value`, replacing any previous value wholesale.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Removes every key in the store.
    fn clear_all(&self) -> StoreResult<()>;
}
