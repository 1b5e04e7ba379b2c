//! Core types for the asset cache server

use asset_cache::{ClearOutcome, ObjectStoreStats, StoreStats};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the asset cache server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub metadata_quota_bytes: u64,
    pub max_body_bytes: usize,
    pub cors_origins: Vec<String>,
    /// Sessions idle this long are evicted by the background sweep; 0 disables it
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3005,
            data_dir: PathBuf::from("./data/asset-cache"),
            metadata_quota_bytes: local_kv_store::DEFAULT_QUOTA_BYTES, // 5MB
            max_body_bytes: 50 * 1024 * 1024,                         // 50MB
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            session_ttl_secs: 7 * 24 * 60 * 60, // 7 days
        }
    }
}

impl ServerConfig {
    /// Directory holding the metadata key-value files
    pub fn kv_dir(&self) -> PathBuf {
        self.data_dir.join("kv")
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub metadata: StoreStats,
    /// Absent when the image store can't be read
    pub images: Option<ObjectStoreStats>,
}

/// Response to a successful save
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub saved: usize,
}

/// Query for evicting sessions
#[derive(Debug, Default, Deserialize)]
pub struct EvictQuery {
    /// Only evict sessions idle at least this long; all sessions when absent
    pub idle_secs: Option<u64>,
}

/// Response to a session eviction
#[derive(Debug, Serialize)]
pub struct EvictResponse {
    pub evicted: Vec<String>,
}

/// Response to a clear
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub metadata_cleared: bool,
    pub images_cleared: bool,
    pub images_removed: u64,
}

impl From<ClearOutcome> for ClearResponse {
    fn from(outcome: ClearOutcome) -> Self {
        Self {
            metadata_cleared: outcome.metadata_cleared,
            images_cleared: outcome.images_cleared,
            images_removed: outcome.images_removed,
        }
    }
}
