//! ClusterSync Operator
//!
//! Kubernetes extension serving cluster backup configuration over REST and
//! provisioning storage for VM disks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          REST API (axum)                             │
//! │   /apis/clustersync.kubesphere.io/v1/{storage,backup,restore,        │
//! │                                      schedule}configs                │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  DTO decode ──► Validation Kit ──► Aggregated-Config Store           │
//! │                                    (read ─► edit ─► create/replace,  │
//! │                                     conflict retry)                  │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                OperatorConfig singleton (custom resource)            │
//! └──────────────────────────────────────────────────────────────────────┘
//!
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  DiskVolume Controller: New ─► Staged ─► Provisioned ─► Ready        │
//! │  (blank PVC on the default StorageClass, or CDI DataVolume clone)    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`api`]: REST router, handlers and server
//! - [`clustersync`]: request contracts, store and repositories
//! - [`controller`]: DiskVolume reconciler
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Port traits and the CDI DataVolume type
//! - [`validation`]: Field validation kit
//! - [`error`]: Error types and handling

pub mod api;
pub mod clustersync;
pub mod controller;
pub mod crd;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod validation;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter};

pub use clustersync::{
    ClusterSyncStore, InMemoryOperatorConfigRepository, KubeOperatorConfigRepository, StoreConfig,
};

pub use controller::ControllerConfig;

pub use crd::{
    BackupConfig, DiskVolume, DiskVolumeSpec, DiskVolumeStatus, GoDuration, OperatorConfig,
    OperatorConfigSpec, RestoreConfig, ScheduleConfig, StorageConfig,
};

pub use domain::ports::{CreateOutcome, DiskVolumeBackend, OperatorConfigRepository};

pub use error::{Error, ErrorAction, Result, ValidationKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
