//! Error types for the asset cache server

use asset_cache::AssetCacheError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

/// Errors that stop the server from starting
#[derive(Debug)]
pub enum ServerError {
    Cache(AssetCacheError),
    Store(local_kv_store::KvStoreError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Cache(err) => write!(f, "Cache error: {}", err),
            ServerError::Store(err) => write!(f, "Metadata store error: {}", err),
            ServerError::Io(err) => write!(f, "IO error: {}", err),
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Cache(err) => Some(err),
            ServerError::Store(err) => Some(err),
            ServerError::Io(err) => Some(err.as_ref()),
            ServerError::Config(_) => None,
        }
    }
}

impl From<AssetCacheError> for ServerError {
    fn from(err: AssetCacheError) -> Self {
        ServerError::Cache(err)
    }
}

impl From<local_kv_store::KvStoreError> for ServerError {
    fn from(err: local_kv_store::KvStoreError) -> Self {
        ServerError::Store(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Request error that converts to an HTTP response
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Cache(AssetCacheError),
}

impl From<AssetCacheError> for ApiError {
    fn from(err: AssetCacheError) -> Self {
        ApiError::Cache(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Cache(err) => cache_error_response(err),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn cache_error_response(err: AssetCacheError) -> (StatusCode, serde_json::Value) {
    match err {
        AssetCacheError::PartialWrite { failed_ids, source } => {
            tracing::warn!(error = %source, failed = failed_ids.len(), "Images not persisted");
            (
                StatusCode::MULTI_STATUS,
                json!({
                    "error": "Banner details saved but some images were not",
                    "failed_ids": failed_ids,
                }),
            )
        }
        AssetCacheError::InvalidScope(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
        AssetCacheError::Serialization(e) => {
            tracing::warn!(error = %e, "Stored banner metadata is unreadable");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "Stored banners could not be read" }),
            )
        }
        AssetCacheError::Metadata(e) if e.is_quota_exceeded() => (
            StatusCode::INSUFFICIENT_STORAGE,
            json!({ "error": e.to_string() }),
        ),
        AssetCacheError::StoreUnavailable(e) => {
            tracing::error!(error = %e, "Image store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Image store unavailable" }),
            )
        }
        AssetCacheError::Metadata(e) => {
            tracing::error!(error = %e, "Metadata store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banner_object_store::ObjectStoreError;

    #[test]
    fn test_config_error_display() {
        let err = ServerError::Config("invalid PORT".to_string());
        assert_eq!(format!("{}", err), "Configuration error: invalid PORT");
    }

    #[test]
    fn test_partial_write_is_multi_status() {
        let response = ApiError::Cache(AssetCacheError::PartialWrite {
            failed_ids: vec![3],
            source: ObjectStoreError::Unavailable("denied".to_string()),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    }

    #[test]
    fn test_quota_is_insufficient_storage() {
        let response = ApiError::Cache(AssetCacheError::Metadata(
            local_kv_store::KvStoreError::QuotaExceeded {
                key: "generatedBanners".to_string(),
                required: 10,
                quota: 5,
            },
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
    }

    #[test]
    fn test_unavailable_is_service_unavailable() {
        let response = ApiError::Cache(AssetCacheError::StoreUnavailable(
            ObjectStoreError::Unavailable("locked".to_string()),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_is_debug() {
        let err = ServerError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
