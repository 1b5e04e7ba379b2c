//! Save, load, update and clear over the two storage tiers

use crate::banner::{Banner, BannerMetadata};
use crate::error::{AssetCacheError, Result};
use crate::scope::CacheScope;
use banner_object_store::{ImageRecord, ObjectStore, ObjectStoreStats};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use local_kv_store::{KeyValueStore, StoreStats};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of a load, with a flag for reads where images could not be resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedBanners {
    pub banners: Vec<Banner>,
    /// The image store failed, so some or all images are missing
    pub degraded: bool,
}

/// What a clear managed to remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub metadata_cleared: bool,
    pub images_cleared: bool,
    pub images_removed: u64,
}

impl ClearOutcome {
    pub fn is_complete(&self) -> bool {
        self.metadata_cleared && self.images_cleared
    }
}

/// A session scope that has metadata stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub name: String,
    /// Last time the session's metadata was written
    pub updated_at: DateTime<Utc>,
}

/// Banner persistence split across a metadata store and an image store
pub struct AssetCache<K, O> {
    metadata: Arc<K>,
    objects: Arc<O>,
    scope: CacheScope,
    /// Serializes save/update/clear across this cache and its scoped clones
    write_lock: Arc<Mutex<()>>,
}

impl<K, O> Clone for AssetCache<K, O> {
    fn clone(&self) -> Self {
        Self {
            metadata: Arc::clone(&self.metadata),
            objects: Arc::clone(&self.objects),
            scope: self.scope.clone(),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl<K: KeyValueStore, O: ObjectStore> AssetCache<K, O> {
    /// A cache over the global scope
    pub fn new(metadata: K, objects: O) -> Self {
        Self {
            metadata: Arc::new(metadata),
            objects: Arc::new(objects),
            scope: CacheScope::Global,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The same stores viewed through another scope
    pub fn scoped(&self, scope: CacheScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn scope(&self) -> &CacheScope {
        &self.scope
    }

    /// Make sure the image store is open and its schema is current.
    /// Safe to call any number of times.
    pub async fn init(&self) -> Result<()> {
        self.objects
            .init()
            .await
            .map_err(AssetCacheError::StoreUnavailable)
    }

    /// Persist the full collection, replacing whatever metadata was stored.
    ///
    /// Metadata is written first. Images are upserted afterwards for banners
    /// that carry one; banners without an image keep any image stored earlier.
    /// If the image store can't be opened or the image write fails, the
    /// metadata stays written and [`AssetCacheError::PartialWrite`] is
    /// returned, even when no banner carried an image.
    pub async fn save(&self, banners: &[Banner]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_locked(banners).await
    }

    async fn save_locked(&self, banners: &[Banner]) -> Result<()> {
        let mut metadata = Vec::with_capacity(banners.len());
        let mut images = Vec::new();
        for banner in banners {
            let (meta, image) = banner.clone().split();
            if let Some(image) = image {
                images.push(ImageRecord { id: meta.id, image });
            }
            metadata.push(meta);
        }

        self.write_metadata(&metadata)?;
        self.write_images(&images).await?;

        info!(
            scope = %self.scope,
            banners = banners.len(),
            images = images.len(),
            "Saved banners"
        );
        Ok(())
    }

    /// Load the collection in stored order. A missing collection loads as empty.
    pub async fn load(&self) -> Result<Vec<Banner>> {
        self.load_with_status().await.map(|loaded| loaded.banners)
    }

    /// Like [`load`](Self::load) but also reports whether the image store
    /// failed. Images that were never stored resolve to `None` without
    /// marking the result degraded.
    pub async fn load_with_status(&self) -> Result<LoadedBanners> {
        let Some(metadata) = self.read_metadata()? else {
            debug!(scope = %self.scope, "No stored banners");
            return Ok(LoadedBanners::default());
        };

        if let Err(e) = self.objects.init().await {
            warn!(scope = %self.scope, error = %e, "Image store unavailable, loading metadata only");
            return Ok(LoadedBanners {
                banners: metadata.into_iter().map(|m| m.with_image(None)).collect(),
                degraded: true,
            });
        }

        let scope = self.scope.object_scope();
        let lookups = join_all(metadata.iter().map(|m| self.objects.get(scope, m.id))).await;

        let mut degraded = false;
        let banners = metadata
            .into_iter()
            .zip(lookups)
            .map(|(meta, lookup)| {
                let image = match lookup {
                    Ok(record) => record.map(|r| r.image),
                    Err(e) => {
                        warn!(id = meta.id, error = %e, "Failed to read banner image");
                        degraded = true;
                        None
                    }
                };
                meta.with_image(image)
            })
            .collect::<Vec<_>>();

        debug!(scope = %self.scope, banners = banners.len(), degraded, "Loaded banners");
        Ok(LoadedBanners { banners, degraded })
    }

    /// Replace the stored banner with the same id.
    ///
    /// Returns `false` without writing anything when no stored banner has
    /// that id. Leaves the state `load` + replace + `save` would.
    pub async fn update(&self, banner: &Banner) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut metadata = self.read_metadata()?.unwrap_or_default();
        let (meta, image) = banner.clone().split();
        let Some(slot) = metadata.iter_mut().find(|m| m.id == meta.id) else {
            debug!(scope = %self.scope, id = meta.id, "Update for unknown banner ignored");
            return Ok(false);
        };
        *slot = meta;

        self.write_metadata(&metadata)?;
        let images: Vec<ImageRecord> = image
            .map(|image| ImageRecord {
                id: banner.id,
                image,
            })
            .into_iter()
            .collect();
        self.write_images(&images).await?;

        debug!(scope = %self.scope, id = banner.id, "Updated banner");
        Ok(true)
    }

    /// Remove the metadata and every image in this scope.
    ///
    /// Both halves are always attempted; failures are logged and reported in
    /// the outcome rather than returned.
    pub async fn clear(&self) -> ClearOutcome {
        let _guard = self.write_lock.lock().await;
        let mut outcome = ClearOutcome::default();

        match self.metadata.remove_item(&self.scope.metadata_key()) {
            Ok(()) => outcome.metadata_cleared = true,
            Err(e) => warn!(scope = %self.scope, error = %e, "Failed to clear banner metadata"),
        }

        match self.objects.clear(self.scope.object_scope()).await {
            Ok(removed) => {
                outcome.images_cleared = true;
                outcome.images_removed = removed;
            }
            Err(e) => warn!(scope = %self.scope, error = %e, "Failed to clear banner images"),
        }

        info!(
            scope = %self.scope,
            complete = outcome.is_complete(),
            images_removed = outcome.images_removed,
            "Cleared banners"
        );
        outcome
    }

    /// Session scopes with stored metadata, oldest first
    pub fn sessions(&self) -> Result<Vec<SessionInfo>> {
        let mut sessions = Vec::new();
        for key in self.metadata.keys()? {
            let Some(CacheScope::Session(name)) = CacheScope::from_session_key(&key) else {
                continue;
            };
            // Removed since keys() was read
            let Some(updated_at) = self.metadata.updated_at(&key)? else {
                continue;
            };
            sessions.push(SessionInfo { name, updated_at });
        }
        sessions.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(sessions)
    }

    /// Clear every session whose metadata has not been written for at least
    /// `max_idle`, returning the names of the sessions removed.
    ///
    /// The global scope is never touched. A zero `max_idle` clears all sessions.
    pub async fn evict_idle_sessions(&self, max_idle: Duration) -> Result<Vec<String>> {
        // Nothing can have been idle longer than the clock goes back
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            return Ok(Vec::new());
        };
        let mut evicted = Vec::new();
        for session in self.sessions()? {
            if session.updated_at > cutoff {
                continue;
            }
            let outcome = self
                .scoped(CacheScope::Session(session.name.clone()))
                .clear()
                .await;
            if outcome.metadata_cleared {
                evicted.push(session.name);
            }
        }

        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                max_idle_secs = max_idle.num_seconds(),
                "Evicted idle sessions"
            );
        }
        Ok(evicted)
    }

    /// Usage of the metadata store
    pub fn metadata_stats(&self) -> StoreStats {
        self.metadata.stats()
    }

    /// Usage of the image store
    pub async fn image_stats(&self) -> Result<ObjectStoreStats> {
        self.objects
            .stats()
            .await
            .map_err(AssetCacheError::StoreUnavailable)
    }

    fn read_metadata(&self) -> Result<Option<Vec<BannerMetadata>>> {
        let Some(raw) = self.metadata.get_item(&self.scope.metadata_key())? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write_metadata(&self, metadata: &[BannerMetadata]) -> Result<()> {
        let json = serde_json::to_string(metadata)?;
        self.metadata
            .set_item(&self.scope.metadata_key(), &json)?;
        Ok(())
    }

    /// Open the image store and upsert `images`. The store is opened even
    /// when there is nothing to write so an unusable store is reported.
    async fn write_images(&self, images: &[ImageRecord]) -> Result<()> {
        let written = match self.objects.init().await {
            Ok(()) => self.objects.put_all(self.scope.object_scope(), images).await,
            Err(e) => Err(e),
        };
        written.map_err(|source| {
            warn!(scope = %self.scope, error = %source, "Banner images not saved");
            AssetCacheError::PartialWrite {
                failed_ids: images.iter().map(|r| r.id).collect(),
                source,
            }
        })
    }
}
