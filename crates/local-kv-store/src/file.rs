//! File-backed key-value store with an in-memory usage index

use crate::error::{KvStoreError, Result};
use crate::types::{StoreStats, StoredEntry};
use crate::{entry_usage, KeyValueStore};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const ENTRY_EXTENSION: &str = "json";

/// A key-value store keeping one JSON file per key inside a directory
pub struct FileKvStore {
    /// Directory holding the entry files
    dir: PathBuf,
    /// Maximum total bytes of keys plus values
    quota: u64,
    /// Usage and last write time per stored key
    index: Mutex<HashMap<String, IndexEntry>>,
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    usage: u64,
    updated_at: DateTime<Utc>,
}

fn used_bytes(index: &HashMap<String, IndexEntry>) -> u64 {
    index.values().map(|e| e.usage).sum()
}

impl FileKvStore {
    /// Open (creating if needed) a store rooted at `dir`, rebuilding the
    /// usage index from the files already present
    pub fn open(dir: impl Into<PathBuf>, quota: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut index = HashMap::new();
        for dir_entry in fs::read_dir(&dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match read_entry(&path) {
                Ok(Some(entry)) => {
                    let usage = entry_usage(&entry.key, &entry.value);
                    index.insert(
                        entry.key,
                        IndexEntry {
                            usage,
                            updated_at: entry.updated_at,
                        },
                    );
                }
                Ok(None) => {}
                Err(e) => warn!(path = ?path, error = %e, "Skipping unreadable entry file"),
            }
        }

        let used = used_bytes(&index);
        info!(dir = ?dir, entries = index.len(), used, quota, "Key-value store opened");

        Ok(Self {
            dir,
            quota,
            index: Mutex::new(index),
        })
    }

    /// File name for a key: keys may contain characters that are not valid in paths
    pub fn entry_file_name(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{}.{}", hex::encode(hasher.finalize()), ENTRY_EXTENSION)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(Self::entry_file_name(key))
    }

    fn lock_index(&self) -> MutexGuard<'_, HashMap<String, IndexEntry>> {
        self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_entry(path: &Path) -> Result<Option<StoredEntry>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| KvStoreError::Corrupt(format!("{}: {}", path.display(), e)))
}

impl KeyValueStore for FileKvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let entry = read_entry(&self.entry_path(key))?;
        match entry {
            Some(entry) if entry.key == key => Ok(Some(entry.value)),
            Some(entry) => Err(KvStoreError::Corrupt(format!(
                "entry file for {} holds key {}",
                key, entry.key
            ))),
            None => Ok(None),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let usage = entry_usage(key, value);

        // Hold the index for the whole write so quota checks can't interleave
        let mut index = self.lock_index();
        let current = used_bytes(&index);
        let previous = index.get(key).map(|e| e.usage).unwrap_or(0);
        let required = current - previous + usage;
        if required > self.quota {
            warn!(key, required, quota = self.quota, "Key-value write rejected");
            return Err(KvStoreError::QuotaExceeded {
                key: key.to_string(),
                required,
                quota: self.quota,
            });
        }

        let updated_at = Utc::now();
        let entry = StoredEntry {
            key: key.to_string(),
            value: value.to_string(),
            updated_at,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| KvStoreError::Corrupt(format!("{}: {}", key, e)))?;

        // Write then rename so readers never see a half-written file
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;

        index.insert(key.to_string(), IndexEntry { usage, updated_at });
        debug!(key, size = usage, "Stored key-value entry");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut index = self.lock_index();
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => debug!(key, "Removed key-value entry"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        index.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.lock_index().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.lock_index().get(key).map(|e| e.updated_at))
    }

    fn stats(&self) -> StoreStats {
        let index = self.lock_index();
        StoreStats {
            entries: index.len(),
            used_bytes: used_bytes(&index),
            quota_bytes: self.quota,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_QUOTA_BYTES;
    use tempfile::tempdir;

    #[test]
    fn test_entry_file_name_generation() {
        let name1 = FileKvStore::entry_file_name("generatedBanners");
        let name2 = FileKvStore::entry_file_name("generatedBanners");
        let name3 = FileKvStore::entry_file_name("generatedBanners:run-42");

        assert_eq!(name1, name2);
        assert_ne!(name1, name3);

        // 64 hex chars for SHA256 plus ".json"
        assert_eq!(name1.len(), 64 + 5);
        assert!(name1.ends_with(".json"));
    }

    #[test]
    fn test_set_and_get() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();

        store.set_item("generatedBanners", "[]").unwrap();
        assert_eq!(
            store.get_item("generatedBanners").unwrap().as_deref(),
            Some("[]")
        );

        store.set_item("generatedBanners", r#"[{"id":1}]"#).unwrap();
        assert_eq!(
            store.get_item("generatedBanners").unwrap().as_deref(),
            Some(r#"[{"id":1}]"#)
        );
    }

    #[test]
    fn test_missing_key() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();

        assert!(store.get_item("nope").unwrap().is_none());
        // Removing a missing key is fine
        store.remove_item("nope").unwrap();
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();

        store.set_item("a", "1").unwrap();
        store.remove_item("a").unwrap();

        assert!(store.get_item("a").unwrap().is_none());
        assert_eq!(store.stats().entries, 0);
        assert_eq!(store.stats().used_bytes, 0);
    }

    #[test]
    fn test_quota_enforced() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), 10).unwrap();

        store.set_item("k", "12345").unwrap();
        let err = store.set_item("other", "123456").unwrap_err();
        assert!(err.is_quota_exceeded());

        // Overwriting an existing key only counts the difference
        store.set_item("k", "123456789").unwrap();
        assert_eq!(store.stats().used_bytes, 10);
    }

    #[test]
    fn test_reopen_rebuilds_index() {
        let dir = tempdir().unwrap();
        {
            let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
            store.set_item("b", "two").unwrap();
            store.set_item("a", "one").unwrap();
        }

        let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.get_item("b").unwrap().as_deref(), Some("two"));

        let stats = store.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.used_bytes, 8);
        assert_eq!(stats.quota_bytes, DEFAULT_QUOTA_BYTES);
    }

    #[test]
    fn test_updated_at_survives_reopen() {
        let dir = tempdir().unwrap();
        let written = {
            let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
            let before = Utc::now();
            store.set_item("generatedBanners:run-1", "[]").unwrap();
            let written = store.updated_at("generatedBanners:run-1").unwrap().unwrap();
            assert!(written >= before);
            written
        };

        let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
        assert_eq!(
            store.updated_at("generatedBanners:run-1").unwrap(),
            Some(written)
        );
        assert!(store.updated_at("missing").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_is_reported() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();

        let path = dir.path().join(FileKvStore::entry_file_name("broken"));
        fs::write(&path, "not json").unwrap();

        let err = store.get_item("broken").unwrap_err();
        assert!(matches!(err, KvStoreError::Corrupt(_)));

        // Reopening skips the unreadable file instead of failing
        let reopened = FileKvStore::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
        assert_eq!(reopened.stats().entries, 0);
    }
}
