//! OperatorConfig repositories
//!
//! [`KubeOperatorConfigRepository`] talks to the API server. The
//! [`InMemoryOperatorConfigRepository`] keeps the singleton in process for
//! standalone mode and tests; it enforces the same resourceVersion rules.

use crate::crd::OperatorConfig;
use crate::domain::OperatorConfigRepository;
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use parking_lot::Mutex;
use tracing::debug;

// =============================================================================
// Kubernetes
// =============================================================================

/// Singleton stored as a namespaced custom resource
pub struct KubeOperatorConfigRepository {
    api: Api<OperatorConfig>,
    name: String,
}

impl KubeOperatorConfigRepository {
    pub fn new(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl OperatorConfigRepository for KubeOperatorConfigRepository {
    async fn fetch(&self) -> Result<Option<OperatorConfig>> {
        Ok(self.api.get_opt(&self.name).await?)
    }

    async fn create(&self, config: &OperatorConfig) -> Result<OperatorConfig> {
        debug!("Creating OperatorConfig {}", self.name);
        Ok(self.api.create(&PostParams::default(), config).await?)
    }

    async fn replace(&self, config: &OperatorConfig) -> Result<OperatorConfig> {
        debug!(
            "Replacing OperatorConfig {} at resourceVersion {:?}",
            self.name,
            config.resource_version()
        );
        Ok(self
            .api
            .replace(&self.name, &PostParams::default(), config)
            .await?)
    }
}

// =============================================================================
// In-Memory
// =============================================================================

#[derive(Default)]
struct Stored {
    object: Option<OperatorConfig>,
    version: u64,
}

/// Process-local singleton with optimistic concurrency
#[derive(Default)]
pub struct InMemoryOperatorConfigRepository {
    state: Mutex<Stored>,
}

impl InMemoryOperatorConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stored object
    pub fn snapshot(&self) -> Option<OperatorConfig> {
        self.state.lock().object.clone()
    }
}

#[async_trait]
impl OperatorConfigRepository for InMemoryOperatorConfigRepository {
    async fn fetch(&self) -> Result<Option<OperatorConfig>> {
        Ok(self.snapshot())
    }

    async fn create(&self, config: &OperatorConfig) -> Result<OperatorConfig> {
        let mut state = self.state.lock();
        if state.object.is_some() {
            return Err(Error::ResourceExists {
                kind: "OperatorConfig".into(),
                name: config.name_any(),
            });
        }
        state.version += 1;
        let mut stored = config.clone();
        stored.metadata.resource_version = Some(state.version.to_string());
        state.object = Some(stored.clone());
        Ok(stored)
    }

    async fn replace(&self, config: &OperatorConfig) -> Result<OperatorConfig> {
        let mut state = self.state.lock();
        let current = state
            .object
            .as_ref()
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "OperatorConfig".into(),
                name: config.name_any(),
            })?;
        if current.metadata.resource_version != config.metadata.resource_version {
            return Err(Error::Conflict {
                kind: "OperatorConfig".into(),
                name: config.name_any(),
                message: format!(
                    "resourceVersion {:?} is stale, current is {:?}",
                    config.metadata.resource_version, current.metadata.resource_version
                ),
            });
        }
        state.version += 1;
        let mut stored = config.clone();
        stored.metadata.resource_version = Some(state.version.to_string());
        state.object = Some(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn singleton() -> OperatorConfig {
        OperatorConfig::empty("operatorconfig", "default")
    }

    #[tokio::test]
    async fn test_in_memory_create_once() {
        let repo = InMemoryOperatorConfigRepository::new();
        assert!(repo.fetch().await.unwrap().is_none());

        let created = repo.create(&singleton()).await.unwrap();
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));

        let err = repo.create(&singleton()).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_in_memory_rejects_stale_replace() {
        let repo = InMemoryOperatorConfigRepository::new();
        let first = repo.create(&singleton()).await.unwrap();

        let second = repo.replace(&first).await.unwrap();
        assert_eq!(second.metadata.resource_version.as_deref(), Some("2"));

        // Writing with the version observed before the last replace
        let err = repo.replace(&first).await.unwrap_err();
        assert!(err.is_conflict());
        assert_matches!(err, Error::Conflict { .. });
    }

    #[tokio::test]
    async fn test_in_memory_replace_requires_object() {
        let repo = InMemoryOperatorConfigRepository::new();
        let err = repo.replace(&singleton()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
