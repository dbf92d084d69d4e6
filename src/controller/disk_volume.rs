//! DiskVolume reconciler
//!
//! Drives each DiskVolume through:
//!
//! ```text
//! New ──► Staged ──► Provisioned ──► Ready
//!  (pvcName      (claim or         (status written:
//!   defaulted)    DataVolume        created, owner, ready)
//!                 created)
//! ```
//!
//! Claim creation is idempotent: an existing claim counts as provisioned.

use crate::crd::{DiskVolume, DiskVolumeStatus, SourceKind, DISK_VOLUME_NAME_LABEL, DISK_VOLUME_OWNER_LABEL};
use crate::domain::data_volume::{
    DataVolumeClaimSpec, DataVolumeResources, DataVolumeSource, DataVolumeSpec, PvcSourceRef,
};
use crate::domain::{CreateOutcome, DataVolume, DiskVolumeBackend};
use crate::error::{Error, ErrorAction, Result};
use crate::metrics;
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

const ACCESS_MODE_RWO: &str = "ReadWriteOnce";
const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const MANAGED_BY: &str = "clustersync-operator";

/// Event reasons
pub const REASON_SYNCED: &str = "Synced";
pub const REASON_PROVISIONED: &str = "Provisioned";
pub const REASON_PROVISION_FAILED: &str = "ProvisionFailed";

// =============================================================================
// Controller Configuration
// =============================================================================

/// DiskVolume controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Parallel reconciles across distinct objects
    pub max_concurrent_reconciles: u16,
    /// Base delay for transient failures
    pub error_requeue: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: 1,
            error_requeue: Duration::from_secs(5),
        }
    }
}

/// Shared reconciler state
pub struct Context {
    pub backend: Arc<dyn DiskVolumeBackend>,
    pub config: ControllerConfig,
}

impl Context {
    pub fn new(backend: Arc<dyn DiskVolumeBackend>, config: ControllerConfig) -> Arc<Self> {
        Arc::new(Self { backend, config })
    }
}

// =============================================================================
// Reconcile
// =============================================================================

/// Reconcile one DiskVolume
#[instrument(skip(disk, ctx), fields(name = %disk.name_any()))]
pub async fn reconcile(disk: Arc<DiskVolume>, ctx: Arc<Context>) -> Result<Action> {
    let start = Instant::now();
    let result = reconcile_inner(&disk, &ctx).await;

    let outcome = if result.is_ok() { "success" } else { "error" };
    metrics::RECONCILES.with_label_values(&[outcome]).inc();
    metrics::RECONCILE_DURATION
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());

    result
}

async fn reconcile_inner(disk: &DiskVolume, ctx: &Context) -> Result<Action> {
    let name = disk.name_any();
    let namespace = disk
        .namespace()
        .ok_or_else(|| Error::Internal(format!("DiskVolume {} has no namespace", name)))?;

    if disk.is_created() && disk.is_ready() {
        debug!("DiskVolume {}/{} is ready", namespace, name);
        ctx.backend
            .publish_event(disk, false, REASON_SYNCED, "DiskVolume synced successfully")
            .await;
        return Ok(Action::await_change());
    }

    // New -> Staged
    let mut disk = disk.clone();
    let staged = stage(&mut disk);
    let pvc_name = disk
        .spec
        .pvc_name
        .clone()
        .unwrap_or_else(|| DiskVolume::default_pvc_name(&name));

    // Staged -> Provisioned
    let outcome = match provision(&disk, &namespace, &pvc_name, ctx.backend.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to provision claim {} for DiskVolume {}/{}: {}", pvc_name, namespace, name, e);
            ctx.backend
                .publish_event(&disk, true, REASON_PROVISION_FAILED, &e.to_string())
                .await;
            return Err(e);
        }
    };
    if outcome == CreateOutcome::Created {
        info!("Provisioned claim {} for DiskVolume {}/{}", pvc_name, namespace, name);
        ctx.backend
            .publish_event(
                &disk,
                false,
                REASON_PROVISIONED,
                &format!("Provisioned claim {}", pvc_name),
            )
            .await;
    }

    if staged {
        disk = ctx.backend.update_disk_volume(&disk).await?;
    }

    // Provisioned -> Ready
    disk.status = Some(DiskVolumeStatus {
        created: true,
        ready: true,
        owner: resolve_owner(&disk),
    });
    ctx.backend.update_status(&disk).await?;

    info!("DiskVolume {}/{} is ready", namespace, name);
    Ok(Action::await_change())
}

/// Default an empty claim name; true if the spec changed
fn stage(disk: &mut DiskVolume) -> bool {
    match disk.spec.pvc_name.as_deref() {
        Some(name) if !name.is_empty() => false,
        _ => {
            disk.spec.pvc_name = Some(DiskVolume::default_pvc_name(&disk.name_any()));
            true
        }
    }
}

async fn provision(
    disk: &DiskVolume,
    namespace: &str,
    pvc_name: &str,
    backend: &dyn DiskVolumeBackend,
) -> Result<CreateOutcome> {
    match disk.spec.source.kind() {
        SourceKind::Blank => {
            let storage_class = backend
                .default_storage_class()
                .await?
                .ok_or(Error::NoDefaultStorageClass)?;
            let pvc = build_pvc(disk, pvc_name, &storage_class)?;
            backend.create_pvc(namespace, &pvc).await
        }
        SourceKind::Image(image) => {
            let dv = build_data_volume(disk, pvc_name, &image.name, &image.namespace)?;
            backend.create_data_volume(namespace, &dv).await
        }
    }
}

/// First owner reference, then the owner label, then empty
pub fn resolve_owner(disk: &DiskVolume) -> String {
    if let Some(owner) = disk.owner_references().first() {
        return owner.name.clone();
    }
    disk.labels()
        .get(DISK_VOLUME_OWNER_LABEL)
        .cloned()
        .unwrap_or_default()
}

// =============================================================================
// Builders
// =============================================================================

fn child_metadata(disk: &DiskVolume, pvc_name: &str) -> Result<ObjectMeta> {
    let mut owner = disk.controller_owner_ref(&()).ok_or_else(|| {
        Error::Internal(format!("DiskVolume {} has no uid", disk.name_any()))
    })?;
    // The DiskVolume cannot be removed while its claim is still present
    owner.block_owner_deletion = Some(true);

    Ok(ObjectMeta {
        name: Some(pvc_name.to_string()),
        namespace: disk.namespace(),
        labels: Some(BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
            (DISK_VOLUME_NAME_LABEL.to_string(), disk.name_any()),
        ])),
        owner_references: Some(vec![owner]),
        ..Default::default()
    })
}

/// Blank claim bound to the given StorageClass
pub fn build_pvc(disk: &DiskVolume, pvc_name: &str, storage_class: &str) -> Result<PersistentVolumeClaim> {
    Ok(PersistentVolumeClaim {
        metadata: child_metadata(disk, pvc_name)?,
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec![ACCESS_MODE_RWO.to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(disk.spec.resources.requests.storage.clone()),
                )])),
                ..Default::default()
            }),
            storage_class_name: Some(storage_class.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// DataVolume cloning the image claim `source_namespace/source_name`
pub fn build_data_volume(
    disk: &DiskVolume,
    pvc_name: &str,
    source_name: &str,
    source_namespace: &str,
) -> Result<DataVolume> {
    Ok(DataVolume::new(
        child_metadata(disk, pvc_name)?,
        DataVolumeSpec {
            source: DataVolumeSource {
                pvc: PvcSourceRef {
                    name: source_name.to_string(),
                    namespace: source_namespace.to_string(),
                },
            },
            pvc: DataVolumeClaimSpec {
                access_modes: vec![ACCESS_MODE_RWO.to_string()],
                resources: DataVolumeResources {
                    requests: BTreeMap::from([(
                        "storage".to_string(),
                        disk.spec.resources.requests.storage.clone(),
                    )]),
                },
                storage_class_name: None,
            },
        },
    ))
}

// =============================================================================
// Error Policy
// =============================================================================

/// Requeue according to [`Error::action`]
pub fn error_policy(disk: Arc<DiskVolume>, error: &Error, ctx: Arc<Context>) -> Action {
    error!(
        error = %error,
        name = %disk.name_any(),
        "DiskVolume reconciliation failed"
    );

    match error.action() {
        ErrorAction::RequeueWithBackoff => Action::requeue(ctx.config.error_requeue),
        ErrorAction::RequeueAfter(delay) => Action::requeue(delay),
        ErrorAction::NoRequeue => Action::await_change(),
    }
}
