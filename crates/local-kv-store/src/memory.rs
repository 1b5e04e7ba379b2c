//! In-process key-value store

use crate::error::{KvStoreError, Result};
use crate::types::StoreStats;
use crate::{entry_usage, KeyValueStore};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A key-value store that lives only as long as the process
pub struct MemoryKvStore {
    quota: u64,
    entries: Mutex<BTreeMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    value: String,
    updated_at: DateTime<Utc>,
}

impl MemoryKvStore {
    pub fn new(quota: u64) -> Self {
        Self {
            quota,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new(crate::DEFAULT_QUOTA_BYTES)
    }
}

fn used_bytes(entries: &BTreeMap<String, MemoryEntry>) -> u64 {
    entries.iter().map(|(k, e)| entry_usage(k, &e.value)).sum()
}

impl KeyValueStore for MemoryKvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).map(|e| e.value.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock();
        let previous = entries
            .get(key)
            .map(|e| entry_usage(key, &e.value))
            .unwrap_or(0);
        let required = used_bytes(&entries) - previous + entry_usage(key, value);
        if required > self.quota {
            return Err(KvStoreError::QuotaExceeded {
                key: key.to_string(),
                required,
                quota: self.quota,
            });
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.lock().get(key).map(|e| e.updated_at))
    }

    fn stats(&self) -> StoreStats {
        let entries = self.lock();
        StoreStats {
            entries: entries.len(),
            used_bytes: used_bytes(&entries),
            quota_bytes: self.quota,
        }
    }
}
