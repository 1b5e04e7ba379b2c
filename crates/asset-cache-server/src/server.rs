//! HTTP server for the banner asset cache
//!
//! Provides /health plus load (GET), save (PUT), update (PATCH) and clear
//! (DELETE) on /banners, and the same operations per generation session on
//! /sessions/{session}/banners. /sessions lists sessions (GET) and evicts
//! idle ones (DELETE).

use crate::error::ApiError;
use crate::types::{ClearResponse, EvictQuery, EvictResponse, HealthResponse, SaveResponse};
use asset_cache::{AssetCache, Banner, CacheScope, SessionInfo};
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Json, Response},
    routing::{get, patch},
    Router,
};
use banner_object_store::SqliteObjectStore;
use chrono::{DateTime, Duration, Utc};
use local_kv_store::FileKvStore;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Header telling the UI that images could not be read on this load
pub const DEGRADED_HEADER: &str = "X-Cache-Degraded";

pub type BannerCache = AssetCache<FileKvStore, SqliteObjectStore>;

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: BannerCache,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: BannerCache) -> Self {
        Self {
            cache,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState, cors_origins: &[String], max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/banners",
            get(load_global).put(save_global).delete(clear_global),
        )
        .route("/banners/{id}", patch(update_global))
        .route("/sessions", get(list_sessions).delete(evict_sessions))
        .route(
            "/sessions/{session}/banners",
            get(load_session).put(save_session).delete(clear_session),
        )
        .route("/sessions/{session}/banners/{id}", patch(update_session))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([header::HeaderName::from_static("x-cache-degraded")]);
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::HeaderName::from_static("x-cache-degraded")])
}

/// Start the HTTP server
pub async fn start_server(
    state: SharedState,
    port: u16,
    cors_origins: &[String],
    max_body_bytes: usize,
) -> std::io::Result<()> {
    let router = create_router(state, cors_origins, max_body_bytes);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    // Clamped: the wall clock can step back past started_at
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;
    let images = match state.cache.image_stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!(error = %e, "Image store stats unavailable");
            None
        }
    };

    Json(HealthResponse {
        status: (if images.is_some() { "ok" } else { "degraded" }).to_string(),
        uptime_secs,
        metadata: state.cache.metadata_stats(),
        images,
    })
}

/// Idle time from seconds, saturating instead of overflowing
pub fn idle_duration(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

async fn list_sessions(State(state): State<SharedState>) -> Result<Json<Vec<SessionInfo>>, ApiError> {
    Ok(Json(state.cache.sessions()?))
}

async fn evict_sessions(
    State(state): State<SharedState>,
    Query(query): Query<EvictQuery>,
) -> Result<Json<EvictResponse>, ApiError> {
    let max_idle = idle_duration(query.idle_secs.unwrap_or(0));
    let evicted = state.cache.evict_idle_sessions(max_idle).await?;
    Ok(Json(EvictResponse { evicted }))
}

fn session_cache(state: &ServerState, session: &str) -> Result<BannerCache, ApiError> {
    let scope = CacheScope::session(session)?;
    Ok(state.cache.scoped(scope))
}

async fn load_banners(cache: &BannerCache) -> Result<Response, ApiError> {
    let loaded = cache.load_with_status().await?;
    let degraded = if loaded.degraded { "true" } else { "false" };
    Ok(([(DEGRADED_HEADER, degraded)], Json(loaded.banners)).into_response())
}

async fn save_banners(cache: &BannerCache, banners: Vec<Banner>) -> Result<Json<SaveResponse>, ApiError> {
    cache.save(&banners).await?;
    Ok(Json(SaveResponse {
        saved: banners.len(),
    }))
}

async fn update_banner(cache: &BannerCache, id: i64, banner: Banner) -> Result<Json<Banner>, ApiError> {
    if banner.id != id {
        return Err(ApiError::BadRequest(format!(
            "Banner id {} does not match path id {}",
            banner.id, id
        )));
    }
    if !cache.update(&banner).await? {
        return Err(ApiError::NotFound(format!("Banner {} not found", id)));
    }
    Ok(Json(banner))
}

async fn load_global(State(state): State<SharedState>) -> Result<Response, ApiError> {
    load_banners(&state.cache).await
}

async fn save_global(
    State(state): State<SharedState>,
    Json(banners): Json<Vec<Banner>>,
) -> Result<Json<SaveResponse>, ApiError> {
    save_banners(&state.cache, banners).await
}

async fn update_global(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(banner): Json<Banner>,
) -> Result<Json<Banner>, ApiError> {
    update_banner(&state.cache, id, banner).await
}

async fn clear_global(State(state): State<SharedState>) -> Json<ClearResponse> {
    Json(state.cache.clear().await.into())
}

async fn load_session(
    State(state): State<SharedState>,
    Path(session): Path<String>,
) -> Result<Response, ApiError> {
    load_banners(&session_cache(&state, &session)?).await
}

async fn save_session(
    State(state): State<SharedState>,
    Path(session): Path<String>,
    Json(banners): Json<Vec<Banner>>,
) -> Result<Json<SaveResponse>, ApiError> {
    save_banners(&session_cache(&state, &session)?, banners).await
}

async fn update_session(
    State(state): State<SharedState>,
    Path((session, id)): Path<(String, i64)>,
    Json(banner): Json<Banner>,
) -> Result<Json<Banner>, ApiError> {
    update_banner(&session_cache(&state, &session)?, id, banner).await
}

async fn clear_session(
    State(state): State<SharedState>,
    Path(session): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let cache = session_cache(&state, &session)?;
    Ok(Json(cache.clear().await.into()))
}
