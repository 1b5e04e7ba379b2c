//! Asset Cache Server - persistence for in-progress banner generation
//!
//! Keeps the banners of a generation run (metadata plus image payloads) on
//! local storage so the UI can recover them after a reload.

mod error;
mod server;
mod types;

use crate::error::Result;
use crate::server::{idle_duration, start_server, ServerState, SharedState};
use crate::types::ServerConfig;
use asset_cache::AssetCache;
use banner_object_store::{ObjectStoreConfig, SqliteObjectStore};
use local_kv_store::FileKvStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("asset_cache_server=info".parse()?)
        .add_directive("asset_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Asset Cache Server...");

    // Load configuration from environment
    let config = load_config();
    info!("Port: {}", config.port);
    info!("Data dir: {:?}", config.data_dir);
    info!(
        "Metadata quota: {} KB",
        config.metadata_quota_bytes / 1024
    );
    info!("Session TTL: {}s", config.session_ttl_secs);

    // Open both storage tiers; the image store must be usable before serving
    let metadata = FileKvStore::open(config.kv_dir(), config.metadata_quota_bytes)?;
    let objects = SqliteObjectStore::new(ObjectStoreConfig::in_data_dir(&config.data_dir));
    let cache = AssetCache::new(metadata, objects);
    cache.init().await?;

    let state: SharedState = Arc::new(ServerState::new(cache));

    // Spawn idle session sweeper (every hour)
    if config.session_ttl_secs > 0 {
        let sweep_state = state.clone();
        let max_idle = idle_duration(config.session_ttl_secs);
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(60 * 60));
            loop {
                ticker.tick().await;
                if let Err(e) = sweep_state.cache.evict_idle_sessions(max_idle).await {
                    error!("Failed to evict idle sessions: {}", e);
                }
            }
        });
    }

    // Start HTTP server (blocking)
    start_server(
        state,
        config.port,
        &config.cors_origins,
        config.max_body_bytes,
    )
    .await?;

    Ok(())
}

fn load_config() -> ServerConfig {
    let defaults = ServerConfig::default();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(defaults.port);

    let data_dir = std::env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.data_dir);

    let metadata_quota_bytes = std::env::var("METADATA_QUOTA_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.metadata_quota_bytes);

    let max_body_bytes = std::env::var("MAX_BODY_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(defaults.max_body_bytes);

    let cors_origins = std::env::var("CORS_ORIGINS")
        .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
        .unwrap_or(defaults.cors_origins);

    let session_ttl_secs = std::env::var("SESSION_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.session_ttl_secs);

    ServerConfig {
        port,
        data_dir,
        metadata_quota_bytes,
        max_body_bytes,
        cors_origins,
        session_ttl_secs,
    }
}
