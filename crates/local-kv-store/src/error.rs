//! Error types for the key-value store

use std::fmt;

#[derive(Debug)]
pub enum KvStoreError {
    Io(Box<std::io::Error>),
    QuotaExceeded {
        key: String,
        required: u64,
        quota: u64,
    },
    Corrupt(String),
}

impl fmt::Display for KvStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvStoreError::Io(err) => write!(f, "IO error: {}", err),
            KvStoreError::QuotaExceeded {
                key,
                required,
                quota,
            } => write!(
                f,
                "Quota exceeded writing {}: {} bytes needed, quota is {} bytes",
                key, required, quota
            ),
            KvStoreError::Corrupt(msg) => write!(f, "Corrupt entry: {}", msg),
        }
    }
}

impl std::error::Error for KvStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KvStoreError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KvStoreError {
    fn from(err: std::io::Error) -> Self {
        KvStoreError::Io(Box::new(err))
    }
}

impl KvStoreError {
    /// Whether the write was rejected for lack of space
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, KvStoreError::QuotaExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, KvStoreError>;
