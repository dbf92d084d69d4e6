//! CDI DataVolume resource
//!
//! Typed struct for the KubeVirt CDI `DataVolume` used to clone an image
//! PVC. CDI is not a dependency of this crate, so the object is written
//! through the dynamic API.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::{ApiResource, GroupVersionKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DATA_VOLUME_GROUP: &str = "cdi.kubevirt.io";
pub const DATA_VOLUME_VERSION: &str = "v1beta1";
pub const DATA_VOLUME_KIND: &str = "DataVolume";

/// CDI DataVolume
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataVolume {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: DataVolumeSpec,
}

impl DataVolume {
    pub fn new(metadata: ObjectMeta, spec: DataVolumeSpec) -> Self {
        Self {
            api_version: format!("{}/{}", DATA_VOLUME_GROUP, DATA_VOLUME_VERSION),
            kind: DATA_VOLUME_KIND.to_string(),
            metadata,
            spec,
        }
    }

    /// ApiResource for dynamic API access
    pub fn api_resource() -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(
            DATA_VOLUME_GROUP,
            DATA_VOLUME_VERSION,
            DATA_VOLUME_KIND,
        ))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataVolumeSpec {
    pub source: DataVolumeSource,
    pub pvc: DataVolumeClaimSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataVolumeSource {
    pub pvc: PvcSourceRef,
}

/// Existing PVC to clone from
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PvcSourceRef {
    pub name: String,
    pub namespace: String,
}

/// Claim template CDI uses for the target PVC
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataVolumeClaimSpec {
    pub access_modes: Vec<String>,
    pub resources: DataVolumeResources,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataVolumeResources {
    pub requests: BTreeMap<String, String>,
}
