//! Store types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default quota, in line with what browsers grant a single origin
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// On-disk representation of one key-value pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Statistics about the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub entries: usize,
    pub used_bytes: u64,
    pub quota_bytes: u64,
}
