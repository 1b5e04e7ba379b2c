//! Object store types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the database; the SQLite file is `<DATABASE_NAME>.sqlite`
pub const DATABASE_NAME: &str = "LinkToAdsBanners";

/// The single collection images are stored in
pub const COLLECTION_NAME: &str = "banners";

/// Latest schema version, equal to the number of migrations
pub const SCHEMA_VERSION: i64 = 2;

/// Scope used by caches that are not bound to a session
pub const GLOBAL_SCOPE: &str = "";

/// One stored image, joined to its banner by `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub image: String,
}

/// Statistics about stored images
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreStats {
    pub images: u64,
    pub total_size: u64,
}

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

/// Configuration for opening the object store
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub location: StoreLocation,
    pub max_connections: u32,
}

impl ObjectStoreConfig {
    /// Store the database file inside `data_dir`
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self {
            location: StoreLocation::File(data_dir.join(format!("{}.sqlite", DATABASE_NAME))),
            max_connections: 5,
        }
    }

    /// Private in-memory database, gone when the store is dropped
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            // Every in-memory connection is its own database
            max_connections: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_data_dir_path() {
        let config = ObjectStoreConfig::in_data_dir(Path::new("/var/lib/cache"));
        assert_eq!(
            config.location,
            StoreLocation::File(PathBuf::from("/var/lib/cache/LinkToAdsBanners.sqlite"))
        );
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_in_memory_uses_single_connection() {
        let config = ObjectStoreConfig::in_memory();
        assert_eq!(config.location, StoreLocation::InMemory);
        assert_eq!(config.max_connections, 1);
    }
}
