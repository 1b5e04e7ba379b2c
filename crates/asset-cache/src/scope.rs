//! Cache scopes: which metadata key and image partition a cache uses

use crate::error::{AssetCacheError, Result};
use banner_object_store::GLOBAL_SCOPE;
use std::fmt;

/// Key the global banner metadata is stored under
pub const METADATA_KEY: &str = "generatedBanners";

const MAX_SESSION_LEN: usize = 64;

/// Partition of the cache a set of operations works on
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CacheScope {
    /// The single shared collection
    #[default]
    Global,
    /// A collection private to one generation run
    Session(String),
}

impl CacheScope {
    /// Scope for a named session. Names are 1-64 ASCII letters, digits, `-` or `_`.
    pub fn session(name: &str) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_SESSION_LEN {
            return Err(AssetCacheError::InvalidScope(format!(
                "session name must be 1-{} characters",
                MAX_SESSION_LEN
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AssetCacheError::InvalidScope(format!(
                "session name {:?} contains invalid characters",
                name
            )));
        }
        Ok(CacheScope::Session(name.to_string()))
    }

    /// Key-value store key holding this scope's metadata
    pub fn metadata_key(&self) -> String {
        match self {
            CacheScope::Global => METADATA_KEY.to_string(),
            CacheScope::Session(name) => format!("{}:{}", METADATA_KEY, name),
        }
    }

    /// The session scope a metadata key belongs to, if it is a session key
    pub fn from_session_key(key: &str) -> Option<Self> {
        let name = key.strip_prefix(METADATA_KEY)?.strip_prefix(':')?;
        Self::session(name).ok()
    }

    /// Object store partition holding this scope's images
    pub fn object_scope(&self) -> &str {
        match self {
            CacheScope::Global => GLOBAL_SCOPE,
            CacheScope::Session(name) => name,
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheScope::Global => write!(f, "global"),
            CacheScope::Session(name) => write!(f, "session:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_scope_keys() {
        let scope = CacheScope::default();
        assert_eq!(scope.metadata_key(), "generatedBanners");
        assert_eq!(scope.object_scope(), "");
        assert_eq!(scope.to_string(), "global");
    }

    #[test]
    fn test_session_scope_keys() {
        let scope = CacheScope::session("run_42-b").unwrap();
        assert_eq!(scope.metadata_key(), "generatedBanners:run_42-b");
        assert_eq!(scope.object_scope(), "run_42-b");
        assert_eq!(scope.to_string(), "session:run_42-b");
    }

    #[test]
    fn test_invalid_session_names() {
        assert!(CacheScope::session("").is_err());
        assert!(CacheScope::session("has space").is_err());
        assert!(CacheScope::session("../etc").is_err());
        assert!(CacheScope::session(&"a".repeat(65)).is_err());
        assert!(CacheScope::session(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_from_session_key() {
        assert_eq!(
            CacheScope::from_session_key("generatedBanners:run-1"),
            Some(CacheScope::Session("run-1".to_string()))
        );
        assert_eq!(CacheScope::from_session_key("generatedBanners"), None);
        assert_eq!(CacheScope::from_session_key("generatedBanners:"), None);
        assert_eq!(CacheScope::from_session_key("otherKey:run-1"), None);
    }
}
