//! Banner asset cache
//!
//! Persists the banners of an in-progress generation flow so they survive a
//! restart of the UI. Each banner is split in two: its small descriptive
//! metadata goes to a [`KeyValueStore`] as one JSON array under a well-known
//! key, and its image payload goes to an [`ObjectStore`] keyed by banner id.
//! The two halves are joined back together on load.
//!
//! Mutating calls made through one [`AssetCache`] (and the scoped caches
//! derived from it) are serialized. Separate processes sharing the same
//! storage are not coordinated.

mod banner;
mod cache;
mod error;
mod scope;

pub use banner::{Banner, BannerMetadata};
pub use cache::{AssetCache, ClearOutcome, LoadedBanners, SessionInfo};
pub use error::{AssetCacheError, Result};
pub use scope::{CacheScope, METADATA_KEY};

pub use banner_object_store::{ObjectStore, ObjectStoreStats};
pub use local_kv_store::{KeyValueStore, StoreStats};
