//! Error types for the asset cache

use banner_object_store::ObjectStoreError;
use local_kv_store::KvStoreError;
use std::fmt;

#[derive(Debug)]
pub enum AssetCacheError {
    /// The image store could not be opened
    StoreUnavailable(ObjectStoreError),
    /// Banner metadata could not be encoded or decoded
    Serialization(serde_json::Error),
    /// The metadata store rejected a read or write
    Metadata(KvStoreError),
    /// Metadata was saved but the listed images were not
    PartialWrite {
        failed_ids: Vec<i64>,
        source: ObjectStoreError,
    },
    InvalidScope(String),
}

impl fmt::Display for AssetCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetCacheError::StoreUnavailable(err) => write!(f, "Image store unavailable: {}", err),
            AssetCacheError::Serialization(err) => write!(f, "Serialization error: {}", err),
            AssetCacheError::Metadata(err) => write!(f, "Metadata store error: {}", err),
            AssetCacheError::PartialWrite { failed_ids, source } => write!(
                f,
                "Metadata saved but {} image(s) were not: {}",
                failed_ids.len(),
                source
            ),
            AssetCacheError::InvalidScope(msg) => write!(f, "Invalid cache scope: {}", msg),
        }
    }
}

impl std::error::Error for AssetCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetCacheError::StoreUnavailable(err) => Some(err),
            AssetCacheError::Serialization(err) => Some(err),
            AssetCacheError::Metadata(err) => Some(err),
            AssetCacheError::PartialWrite { source, .. } => Some(source),
            AssetCacheError::InvalidScope(_) => None,
        }
    }
}

impl From<serde_json::Error> for AssetCacheError {
    fn from(err: serde_json::Error) -> Self {
        AssetCacheError::Serialization(err)
    }
}

impl From<KvStoreError> for AssetCacheError {
    fn from(err: KvStoreError) -> Self {
        AssetCacheError::Metadata(err)
    }
}

impl AssetCacheError {
    /// True when the metadata half of a write is durable
    pub fn is_partial_write(&self) -> bool {
        matches!(self, AssetCacheError::PartialWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, AssetCacheError>;
