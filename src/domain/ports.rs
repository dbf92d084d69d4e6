//! Domain Ports - Core trait definitions for the operator
//!
//! These traits define the boundaries between the domain logic and the
//! Kubernetes API server. Adapters implement them against a live cluster;
//! tests substitute in-memory or mock implementations.

use crate::crd::{DiskVolume, OperatorConfig};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use serde::{Deserialize, Serialize};

use super::data_volume::DataVolume;

// =============================================================================
// OperatorConfig Persistence
// =============================================================================

/// Storage of the OperatorConfig singleton.
///
/// Every write carries the resource version observed by the preceding
/// `fetch`; a stale version fails with a conflict error.
#[async_trait]
pub trait OperatorConfigRepository: Send + Sync {
    /// Read the singleton, `None` if it has not been created yet
    async fn fetch(&self) -> Result<Option<OperatorConfig>>;

    /// Create the singleton
    async fn create(&self, config: &OperatorConfig) -> Result<OperatorConfig>;

    /// Replace the singleton (optimistic concurrency on resourceVersion)
    async fn replace(&self, config: &OperatorConfig) -> Result<OperatorConfig>;
}

// =============================================================================
// DiskVolume Provisioning
// =============================================================================

/// Result of an idempotent create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Cluster operations needed by the DiskVolume reconciler
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiskVolumeBackend: Send + Sync {
    /// Name of the StorageClass annotated as cluster default
    async fn default_storage_class(&self) -> Result<Option<String>>;

    /// Create a claim; an existing claim is reported, not failed
    async fn create_pvc(&self, namespace: &str, pvc: &PersistentVolumeClaim)
        -> Result<CreateOutcome>;

    /// Create a CDI DataVolume; an existing one is reported, not failed
    async fn create_data_volume(&self, namespace: &str, dv: &DataVolume) -> Result<CreateOutcome>;

    /// Persist the DiskVolume object (spec and metadata)
    async fn update_disk_volume(&self, disk: &DiskVolume) -> Result<DiskVolume>;

    /// Persist the DiskVolume status subresource
    async fn update_status(&self, disk: &DiskVolume) -> Result<DiskVolume>;

    /// Emit a Kubernetes Event about the DiskVolume
    async fn publish_event(&self, disk: &DiskVolume, warning: bool, reason: &str, note: &str);
}
