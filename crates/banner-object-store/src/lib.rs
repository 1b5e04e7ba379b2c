//! Banner object store
//!
//! A transactional, versioned, key-indexed store for the large image half of
//! a banner. Each store holds one named collection (`banners`) keyed by the
//! banner id and partitioned by cache scope. The schema is created and
//! upgraded through ordered migrations the first time the store is opened.

pub mod error;
pub mod sqlite;
pub mod types;

pub use error::{ObjectStoreError, Result};
pub use sqlite::SqliteObjectStore;
pub use types::{
    ImageRecord, ObjectStoreConfig, ObjectStoreStats, StoreLocation, COLLECTION_NAME,
    DATABASE_NAME, GLOBAL_SCOPE, SCHEMA_VERSION,
};

use async_trait::async_trait;

/// Async key-indexed storage for banner images.
///
/// Every operation opens the store on demand; opening is idempotent and
/// fails with [`ObjectStoreError::Unavailable`] when the backing storage
/// can't be reached.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open the store, creating or upgrading its schema if needed
    async fn init(&self) -> Result<()>;

    /// Look up the image stored for `id` in `scope`
    async fn get(&self, scope: &str, id: i64) -> Result<Option<ImageRecord>>;

    /// Upsert all `records` into `scope` inside a single transaction
    async fn put_all(&self, scope: &str, records: &[ImageRecord]) -> Result<()>;

    /// Delete every image in `scope`, returning how many were removed
    async fn clear(&self, scope: &str) -> Result<u64>;

    /// Image count and payload size across all scopes
    async fn stats(&self) -> Result<ObjectStoreStats>;
}
