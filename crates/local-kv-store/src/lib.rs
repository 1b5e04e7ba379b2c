//! Synchronous string key-value store with a byte quota
//!
//! Models the small, blocking key-value facility a UI keeps its structured
//! state in. Values are opaque strings; the store enforces a total byte quota
//! so callers have to keep large payloads elsewhere.

mod error;
mod file;
mod memory;
mod types;

pub use error::{KvStoreError, Result};
pub use file::FileKvStore;
pub use memory::MemoryKvStore;
pub use types::{StoreStats, StoredEntry, DEFAULT_QUOTA_BYTES};

use chrono::{DateTime, Utc};

/// A blocking string-keyed store for small values
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys currently stored, sorted
    fn keys(&self) -> Result<Vec<String>>;

    /// When `key` was last written, if it is stored
    fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>>;

    /// Current usage figures
    fn stats(&self) -> StoreStats;
}

/// Bytes a key/value pair counts against the quota
pub(crate) fn entry_usage(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}
