//! DiskVolume controller
//!
//! Watches DiskVolume resources cluster-wide and the claims they own.

pub mod backend;
pub mod disk_volume;

pub use backend::KubeDiskVolumeBackend;
pub use disk_volume::{error_policy, reconcile, Context, ControllerConfig};

use crate::crd::DiskVolume;
use futures::StreamExt;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::{controller, watcher, Controller};
use kube::{Api, Client};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run the controller until SIGTERM or Ctrl-C
pub async fn run(client: Client, config: ControllerConfig) {
    let disks: Api<DiskVolume> = Api::all(client.clone());
    let claims: Api<PersistentVolumeClaim> = Api::all(client.clone());

    info!(
        "Starting DiskVolume controller (max concurrent reconciles: {})",
        config.max_concurrent_reconciles
    );

    let backend = Arc::new(KubeDiskVolumeBackend::new(client));
    let ctx = Context::new(backend, config.clone());

    Controller::new(disks, watcher::Config::default())
        .owns(claims, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(config.max_concurrent_reconciles))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => debug!("Reconciled DiskVolume {}", obj.name),
                Err(e) => warn!("DiskVolume reconcile error: {}", e),
            }
        })
        .await;

    info!("DiskVolume controller stopped");
}
