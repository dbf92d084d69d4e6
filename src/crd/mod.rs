//! Custom Resource Definitions for the ClusterSync operator
//!
//! This module contains all CRD types:
//! - OperatorConfig: singleton holding storage/backup/restore/schedule configs
//! - DiskVolume: VM disk backed by a blank or cloned PVC

pub mod disk_volume;
pub mod duration;
pub mod operator_config;

pub use disk_volume::*;
pub use duration::GoDuration;
pub use operator_config::*;

use crate::error::Result;
use kube::CustomResourceExt;

/// Render every CRD owned by this crate as a multi-document YAML stream
pub fn crds_yaml() -> Result<String> {
    let mut out = String::new();
    for crd in [OperatorConfig::crd(), DiskVolume::crd()] {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&crd)?);
    }
    Ok(out)
}
