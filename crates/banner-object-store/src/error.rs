//! Error types for the banner object store

use std::fmt;

#[derive(Debug)]
pub enum ObjectStoreError {
    /// The store could not be opened or its schema could not be brought up to date
    Unavailable(String),
    Database(Box<sqlx::Error>),
}

impl fmt::Display for ObjectStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectStoreError::Unavailable(msg) => write!(f, "Object store unavailable: {}", msg),
            ObjectStoreError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ObjectStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ObjectStoreError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ObjectStoreError {
    fn from(err: sqlx::Error) -> Self {
        ObjectStoreError::Database(Box::new(err))
    }
}

impl ObjectStoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ObjectStoreError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, ObjectStoreError>;
