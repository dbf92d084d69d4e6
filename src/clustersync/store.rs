//! Aggregated-config store
//!
//! CRUD over the four named collections of the OperatorConfig singleton.
//! Every mutation is a read-modify-write of the whole object:
//!
//! 1. Fetch the singleton (or build an empty one if it does not exist)
//! 2. Apply the change to the in-memory copy
//! 3. Create or replace with the observed resourceVersion
//!
//! A write rejected for a stale resourceVersion is retried from step 1, up
//! to [`StoreConfig::conflict_retries`] attempts. A lost create race is
//! retried the same way.

use crate::crd::{ConfigEntry, OperatorConfig, OPERATOR_CONFIG_NAME, OPERATOR_CONFIG_NAMESPACE};
use crate::domain::OperatorConfigRepository;
use crate::error::{Error, Result};
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Singleton name
    pub name: String,
    /// Singleton namespace
    pub namespace: String,
    /// Attempts per write when the resourceVersion is stale
    pub conflict_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: OPERATOR_CONFIG_NAME.to_string(),
            namespace: OPERATOR_CONFIG_NAMESPACE.to_string(),
            conflict_retries: 3,
        }
    }
}

/// Name-keyed CRUD over the singleton's collections
#[derive(Clone)]
pub struct ClusterSyncStore {
    repo: Arc<dyn OperatorConfigRepository>,
    config: StoreConfig,
}

impl ClusterSyncStore {
    pub fn new(repo: Arc<dyn OperatorConfigRepository>, config: StoreConfig) -> Self {
        Self { repo, config }
    }

    /// The backing repository answers reads
    pub async fn is_reachable(&self) -> bool {
        self.repo.fetch().await.is_ok()
    }

    /// Append an entry, creating the singleton on first use
    pub async fn create<E: ConfigEntry>(&self, entry: E) -> Result<String> {
        let name = entry.name().to_string();
        self.write(|config, _| {
            let entries = E::collection_mut(&mut config.spec);
            if entries.iter().any(|e| e.name() == name) {
                return Err(Error::Duplicated {
                    kind: E::KIND,
                    name: name.clone(),
                });
            }
            entries.push(entry.clone());
            Ok(())
        })
        .await?;

        info!("Created {} {}", E::KIND, name);
        Ok(name)
    }

    /// Patch an existing entry in place.
    ///
    /// `apply` runs against the freshly read entry on every attempt.
    pub async fn update<E, F>(&self, name: &str, apply: F) -> Result<E>
    where
        E: ConfigEntry,
        F: Fn(&mut E) -> Result<()> + Send + Sync,
    {
        let updated = self
            .write(|config, fresh| {
                if fresh {
                    return Err(Error::OperatorConfigNotCreated);
                }
                let entry = E::collection_mut(&mut config.spec)
                    .iter_mut()
                    .find(|e| e.name() == name)
                    .ok_or_else(|| Error::EntryNotFound {
                        kind: E::KIND,
                        name: name.to_string(),
                    })?;
                apply(entry)?;
                Ok(entry.clone())
            })
            .await?;

        info!("Updated {} {}", E::KIND, name);
        Ok(updated)
    }

    /// Look up one entry
    pub async fn get<E: ConfigEntry>(&self, name: &str) -> Result<E> {
        self.repo
            .fetch()
            .await?
            .and_then(|config| {
                E::collection(&config.spec)
                    .iter()
                    .find(|e| e.name() == name)
                    .cloned()
            })
            .ok_or_else(|| Error::EntryNotFound {
                kind: E::KIND,
                name: name.to_string(),
            })
    }

    /// All entries of one collection, in stored order
    pub async fn list<E: ConfigEntry>(&self) -> Result<Vec<E>> {
        let config = self
            .repo
            .fetch()
            .await?
            .ok_or(Error::OperatorConfigNotCreated)?;
        Ok(E::collection(&config.spec).clone())
    }

    /// Remove an entry. Removing a name that is not present succeeds, also
    /// before the singleton exists.
    pub async fn delete<E: ConfigEntry>(&self, name: &str) -> Result<()> {
        let attempts = self.config.conflict_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let Some(mut config) = self.repo.fetch().await? else {
                debug!("OperatorConfig not created, nothing to delete for {} {}", E::KIND, name);
                return Ok(());
            };

            let entries = E::collection_mut(&mut config.spec);
            let before = entries.len();
            entries.retain(|e| e.name() != name);
            if entries.len() == before {
                debug!("{} {} not present, nothing to delete", E::KIND, name);
                return Ok(());
            }

            match self.repo.replace(&config).await {
                Ok(_) => {
                    info!("Deleted {} {}", E::KIND, name);
                    return Ok(());
                }
                Err(e) if e.is_conflict() && attempt < attempts => {
                    self.note_retry(attempt, attempts, &e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read-modify-write with conflict retry.
    ///
    /// `mutate` receives the singleton and whether it was just built
    /// because none exists yet.
    async fn write<T, F>(&self, mut mutate: F) -> Result<T>
    where
        F: FnMut(&mut OperatorConfig, bool) -> Result<T>,
    {
        let attempts = self.config.conflict_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut config, fresh) = match self.repo.fetch().await? {
                Some(config) => (config, false),
                None => (
                    OperatorConfig::empty(&self.config.name, &self.config.namespace),
                    true,
                ),
            };

            let out = mutate(&mut config, fresh)?;

            let written = if fresh {
                self.repo.create(&config).await
            } else {
                self.repo.replace(&config).await
            };

            match written {
                Ok(_) => return Ok(out),
                Err(e) if (e.is_conflict() || e.is_already_exists()) && attempt < attempts => {
                    self.note_retry(attempt, attempts, &e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn note_retry(&self, attempt: u32, attempts: u32, err: &Error) {
        metrics::CONFLICT_RETRIES.inc();
        warn!(
            "OperatorConfig {}/{} write attempt {}/{} lost a race, retrying: {}",
            self.config.namespace, self.config.name, attempt, attempts, err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustersync::repository::InMemoryOperatorConfigRepository;
    use crate::crd::{BackupConfig, RestoreConfig, StorageConfig};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn storage(name: &str) -> StorageConfig {
        StorageConfig {
            storage_name: name.into(),
            provider: "aws".into(),
            bucket: "b".into(),
            ..Default::default()
        }
    }

    fn store_with(repo: Arc<dyn OperatorConfigRepository>) -> ClusterSyncStore {
        ClusterSyncStore::new(repo, StoreConfig::default())
    }

    fn store() -> (ClusterSyncStore, Arc<InMemoryOperatorConfigRepository>) {
        let repo = Arc::new(InMemoryOperatorConfigRepository::new());
        (store_with(repo.clone()), repo)
    }

    /// Bumps the stored resourceVersion behind the caller's back a fixed
    /// number of times, simulating concurrent writers.
    struct RacingRepository {
        inner: InMemoryOperatorConfigRepository,
        races: AtomicU32,
    }

    #[async_trait]
    impl OperatorConfigRepository for RacingRepository {
        async fn fetch(&self) -> Result<Option<OperatorConfig>> {
            self.inner.fetch().await
        }

        async fn create(&self, config: &OperatorConfig) -> Result<OperatorConfig> {
            self.inner.create(config).await
        }

        async fn replace(&self, config: &OperatorConfig) -> Result<OperatorConfig> {
            if self.races.load(Ordering::SeqCst) > 0 {
                self.races.fetch_sub(1, Ordering::SeqCst);
                if let Some(current) = self.inner.fetch().await? {
                    self.inner.replace(&current).await?;
                }
            }
            self.inner.replace(config).await
        }
    }

    #[tokio::test]
    async fn test_first_create_builds_singleton() {
        let (store, repo) = store();
        assert!(repo.snapshot().is_none());

        let name = store.create(storage("s1")).await.unwrap();
        assert_eq!(name, "s1");

        let config = repo.snapshot().unwrap();
        assert_eq!(config.metadata.name.as_deref(), Some("operatorconfig"));
        assert_eq!(config.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(config.spec.storage_configs.len(), 1);
        assert!(config.spec.backup_configs.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let (store, repo) = store();
        store.create(storage("s1")).await.unwrap();

        let err = store.create(storage("s1")).await.unwrap_err();
        assert_eq!(err.to_string(), "StorageConfig \"s1\" duplicated");
        assert_eq!(repo.snapshot().unwrap().spec.storage_configs.len(), 1);
    }

    #[tokio::test]
    async fn test_same_name_in_different_collections() {
        let (store, _) = store();
        store.create(storage("x")).await.unwrap();
        store
            .create(RestoreConfig {
                restore_name: "x".into(),
                backup_name: "b".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(store.list::<StorageConfig>().await.unwrap().len(), 1);
        assert_eq!(store.list::<RestoreConfig>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_preserves_position() {
        let (store, _) = store();
        for name in ["s1", "s2", "s3"] {
            store.create(storage(name)).await.unwrap();
        }

        let updated: StorageConfig = store
            .update("s2", |entry: &mut StorageConfig| {
                entry.region = "eu-west-1".into();
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(updated.region, "eu-west-1");
        assert_eq!(updated.bucket, "b");

        let names: Vec<String> = store
            .list::<StorageConfig>()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.storage_name)
            .collect();
        assert_eq!(names, vec!["s1", "s2", "s3"]);
    }

    #[tokio::test]
    async fn test_update_requires_singleton_and_entry() {
        let (store, _) = store();
        let result = store
            .update::<StorageConfig, _>("s1", |_| Ok(()))
            .await;
        assert_matches!(result, Err(Error::OperatorConfigNotCreated));

        store.create(storage("s1")).await.unwrap();
        let result = store
            .update::<StorageConfig, _>("missing", |_| Ok(()))
            .await;
        assert_matches!(result, Err(Error::EntryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_failed_apply_leaves_singleton_untouched() {
        let (store, repo) = store();
        store.create(storage("s1")).await.unwrap();
        let before = repo.snapshot().unwrap();

        let result = store
            .update::<StorageConfig, _>("s1", |entry| {
                entry.bucket = "changed".into();
                Err(Error::invalid("Invalid Bucket : changed"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(repo.snapshot().unwrap(), before);
    }

    #[tokio::test]
    async fn test_get_and_list_missing() {
        let (store, _) = store();
        assert_matches!(
            store.get::<BackupConfig>("daily").await,
            Err(Error::EntryNotFound { kind: "BackupConfig", .. })
        );
        assert_matches!(
            store.list::<BackupConfig>().await,
            Err(Error::OperatorConfigNotCreated)
        );
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let (store, repo) = store();
        store.delete::<StorageConfig>("s1").await.unwrap();
        assert!(repo.snapshot().is_none());

        store.create(storage("s1")).await.unwrap();
        store.create(storage("s2")).await.unwrap();

        store.delete::<StorageConfig>("s1").await.unwrap();
        assert_matches!(
            store.get::<StorageConfig>("s1").await,
            Err(Error::EntryNotFound { kind: "StorageConfig", .. })
        );
        store.delete::<StorageConfig>("s1").await.unwrap();
        store.delete::<StorageConfig>("s2").await.unwrap();

        // The singleton outlives its last entry
        let config = repo.snapshot().unwrap();
        assert!(config.spec.storage_configs.is_empty());
        assert!(store.list::<StorageConfig>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let repo = Arc::new(RacingRepository {
            inner: InMemoryOperatorConfigRepository::new(),
            races: AtomicU32::new(0),
        });
        let store = store_with(repo.clone());
        store.create(storage("s1")).await.unwrap();

        repo.races.store(2, Ordering::SeqCst);
        store.create(storage("s2")).await.unwrap();
        assert_eq!(store.list::<StorageConfig>().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_retries_are_bounded() {
        let repo = Arc::new(RacingRepository {
            inner: InMemoryOperatorConfigRepository::new(),
            races: AtomicU32::new(0),
        });
        let store = store_with(repo.clone());
        store.create(storage("s1")).await.unwrap();

        repo.races.store(10, Ordering::SeqCst);
        let err = store.create(storage("s2")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.races.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_concurrent_creates_all_land() {
        let repo = Arc::new(InMemoryOperatorConfigRepository::new());
        let store = ClusterSyncStore::new(
            repo.clone(),
            StoreConfig {
                conflict_retries: 50,
                ..Default::default()
            },
        );

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(storage(&format!("s{}", i))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.snapshot().unwrap().spec.storage_configs.len(), 8);
    }
}
