//! SQLite-backed object store

use crate::error::{ObjectStoreError, Result};
use crate::types::{
    ImageRecord, ObjectStoreConfig, ObjectStoreStats, StoreLocation, COLLECTION_NAME, DATABASE_NAME,
};
use crate::ObjectStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Object store over a SQLite database, opened lazily on first use
pub struct SqliteObjectStore {
    config: ObjectStoreConfig,
    pool: OnceCell<SqlitePool>,
}

impl SqliteObjectStore {
    pub fn new(config: ObjectStoreConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// The open pool, connecting and migrating on first call
    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool.get_or_try_init(|| open_pool(&self.config)).await
    }

    /// Highest migration version applied to the database
    pub async fn schema_version(&self) -> Result<i64> {
        let pool = self.pool().await?;
        let (version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations")
                .fetch_one(pool)
                .await?;
        Ok(version)
    }
}

async fn open_pool(config: &ObjectStoreConfig) -> Result<SqlitePool> {
    let options = match &config.location {
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ObjectStoreError::Unavailable(format!("{}: {}", parent.display(), e))
                })?;
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        }
        StoreLocation::InMemory => SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| ObjectStoreError::Unavailable(e.to_string()))?,
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        // Keep in-memory databases alive for the life of the pool
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| ObjectStoreError::Unavailable(e.to_string()))?;

    info!(location = ?config.location, "Running object store migrations...");
    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| ObjectStoreError::Unavailable(format!("migration failed: {}", e)))?;
    info!(database = DATABASE_NAME, collection = COLLECTION_NAME, "Object store ready");

    Ok(pool)
}

#[async_trait]
impl ObjectStore for SqliteObjectStore {
    async fn init(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    async fn get(&self, scope: &str, id: i64) -> Result<Option<ImageRecord>> {
        let pool = self.pool().await?;
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, image FROM banners WHERE scope = ? AND id = ?")
                .bind(scope)
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(id, image)| ImageRecord { id, image }))
    }

    async fn put_all(&self, scope: &str, records: &[ImageRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let pool = self.pool().await?;
        let now = Utc::now();
        let mut tx = pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO banners (scope, id, image, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (scope, id) DO UPDATE SET image = excluded.image, updated_at = excluded.updated_at
                "#,
            )
            .bind(scope)
            .bind(record.id)
            .bind(&record.image)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(scope, count = records.len(), "Stored banner images");
        Ok(())
    }

    async fn clear(&self, scope: &str) -> Result<u64> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM banners WHERE scope = ?")
            .bind(scope)
            .execute(pool)
            .await?;
        debug!(scope, removed = result.rows_affected(), "Cleared banner images");
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<ObjectStoreStats> {
        let pool = self.pool().await?;
        // LENGTH of a TEXT value counts characters; cast to count bytes
        let (images, total_size): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(CAST(image AS BLOB))), 0) FROM banners",
        )
        .fetch_one(pool)
        .await?;
        Ok(ObjectStoreStats {
            images: images as u64,
            total_size: total_size as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GLOBAL_SCOPE, SCHEMA_VERSION};
    use tempfile::tempdir;

    fn record(id: i64, image: &str) -> ImageRecord {
        ImageRecord {
            id,
            image: image.to_string(),
        }
    }

    fn memory_store() -> SqliteObjectStore {
        SqliteObjectStore::new(ObjectStoreConfig::in_memory())
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let store = memory_store();
        store.init().await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = memory_store();
        store
            .put_all(GLOBAL_SCOPE, &[record(1, "img1"), record(2, "img2")])
            .await
            .unwrap();

        assert_eq!(
            store.get(GLOBAL_SCOPE, 1).await.unwrap(),
            Some(record(1, "img1"))
        );
        assert_eq!(
            store.get(GLOBAL_SCOPE, 2).await.unwrap(),
            Some(record(2, "img2"))
        );
        assert!(store.get(GLOBAL_SCOPE, 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = memory_store();
        store.put_all(GLOBAL_SCOPE, &[record(1, "old")]).await.unwrap();
        store.put_all(GLOBAL_SCOPE, &[record(1, "new")]).await.unwrap();

        assert_eq!(
            store.get(GLOBAL_SCOPE, 1).await.unwrap(),
            Some(record(1, "new"))
        );
        assert_eq!(store.stats().await.unwrap().images, 1);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let store = memory_store();
        store.put_all(GLOBAL_SCOPE, &[record(1, "global")]).await.unwrap();
        store.put_all("run-a", &[record(1, "session")]).await.unwrap();

        assert_eq!(
            store.get("run-a", 1).await.unwrap(),
            Some(record(1, "session"))
        );

        assert_eq!(store.clear("run-a").await.unwrap(), 1);
        assert!(store.get("run-a", 1).await.unwrap().is_none());
        assert_eq!(
            store.get(GLOBAL_SCOPE, 1).await.unwrap(),
            Some(record(1, "global"))
        );
    }

    #[tokio::test]
    async fn test_clear_empty_scope() {
        let store = memory_store();
        assert_eq!(store.clear(GLOBAL_SCOPE).await.unwrap(), 0);
        assert_eq!(store.clear(GLOBAL_SCOPE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = memory_store();
        store
            .put_all(GLOBAL_SCOPE, &[record(1, "abcd"), record(2, "ef")])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.images, 2);
        assert_eq!(stats.total_size, 6);
    }

    #[tokio::test]
    async fn test_stats_count_bytes_not_characters() {
        let store = memory_store();
        // 2 + 3 + 4 bytes in 3 characters
        store.put_all(GLOBAL_SCOPE, &[record(1, "é€😀")]).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.images, 1);
        assert_eq!(stats.total_size, "é€😀".len() as u64);
        assert_eq!(stats.total_size, 9);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = SqliteObjectStore::new(ObjectStoreConfig::in_data_dir(dir.path()));
            store.put_all(GLOBAL_SCOPE, &[record(7, "img7")]).await.unwrap();
        }

        let store = SqliteObjectStore::new(ObjectStoreConfig::in_data_dir(dir.path()));
        assert_eq!(
            store.get(GLOBAL_SCOPE, 7).await.unwrap(),
            Some(record(7, "img7"))
        );
        assert!(dir.path().join("LinkToAdsBanners.sqlite").exists());
    }

    #[tokio::test]
    async fn test_unreachable_location_is_unavailable() {
        let dir = tempdir().unwrap();
        // A regular file where the data directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let store = SqliteObjectStore::new(ObjectStoreConfig::in_data_dir(&blocker.join("data")));
        let err = store.init().await.unwrap_err();
        assert!(err.is_unavailable());

        let err = store.get(GLOBAL_SCOPE, 1).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
