//! DiskVolume CRD
//!
//! A virtual-machine disk backed by a PersistentVolumeClaim. The claim is
//! either provisioned blank or cloned from an image PVC through a CDI
//! DataVolume.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label recording the owner of a DiskVolume when no owner reference is set
pub const DISK_VOLUME_OWNER_LABEL: &str = "virtualization.kubesphere.io/diskvolume-owner";

/// Label placed on claims provisioned for a DiskVolume
pub const DISK_VOLUME_NAME_LABEL: &str = "virtualization.kubesphere.io/diskvolume";

/// Prefix of generated claim names
pub const PVC_NAME_PREFIX: &str = "tpl-";

// =============================================================================
// DiskVolume CRD
// =============================================================================

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "virtualization.kubesphere.io",
    version = "v1alpha1",
    kind = "DiskVolume",
    plural = "diskvolumes",
    shortname = "dskv",
    derive = "PartialEq",
    status = "DiskVolumeStatus",
    printcolumn = r#"{"name": "PVC", "type": "string", "jsonPath": ".spec.pvcName"}"#,
    printcolumn = r#"{"name": "Created", "type": "boolean", "jsonPath": ".status.created"}"#,
    printcolumn = r#"{"name": "Ready", "type": "boolean", "jsonPath": ".status.ready"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct DiskVolumeSpec {
    /// Backing claim name; defaults to `tpl-<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_name: Option<String>,

    #[serde(default)]
    pub source: DiskVolumeSource,

    #[serde(default)]
    pub resources: DiskVolumeResources,
}

/// Where the disk content comes from. Exactly one member is expected;
/// an empty source is treated as blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskVolumeSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank: Option<BlankSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlankSource {}

/// Image PVC to clone from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageSource {
    pub name: String,
    pub namespace: String,
}

/// Resolved source discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind<'a> {
    Blank,
    Image(&'a ImageSource),
}

impl DiskVolumeSource {
    pub fn kind(&self) -> SourceKind<'_> {
        match &self.image {
            Some(image) if self.blank.is_none() => SourceKind::Image(image),
            _ => SourceKind::Blank,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiskVolumeResources {
    #[serde(default)]
    pub requests: DiskVolumeRequests,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiskVolumeRequests {
    /// Requested capacity (e.g., "10Gi")
    #[serde(default)]
    pub storage: String,
}

/// DiskVolume status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskVolumeStatus {
    /// Backing claim has been provisioned
    #[serde(default)]
    pub created: bool,

    #[serde(default)]
    pub ready: bool,

    /// Informational copy of the owner; owner references stay authoritative
    #[serde(default)]
    pub owner: String,
}

impl DiskVolume {
    pub fn is_created(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.created)
    }

    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.ready)
    }

    /// Backing claim name, defaulted from the resource name
    pub fn default_pvc_name(name: &str) -> String {
        format!("{}{}", PVC_NAME_PREFIX, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind() {
        let blank: DiskVolumeSource = serde_json::from_value(serde_json::json!({"blank": {}})).unwrap();
        assert_eq!(blank.kind(), SourceKind::Blank);

        let image: DiskVolumeSource = serde_json::from_value(serde_json::json!({
            "image": {"name": "ubuntu-2204", "namespace": "images"}
        }))
        .unwrap();
        match image.kind() {
            SourceKind::Image(src) => {
                assert_eq!(src.name, "ubuntu-2204");
                assert_eq!(src.namespace, "images");
            }
            SourceKind::Blank => panic!("expected image source"),
        }

        assert_eq!(DiskVolumeSource::default().kind(), SourceKind::Blank);
    }

    #[test]
    fn test_disk_volume_wire_format() {
        let dv: DiskVolume = serde_json::from_value(serde_json::json!({
            "apiVersion": "virtualization.kubesphere.io/v1alpha1",
            "kind": "DiskVolume",
            "metadata": {"name": "d1", "namespace": "vm"},
            "spec": {
                "source": {"blank": {}},
                "resources": {"requests": {"storage": "10Gi"}}
            }
        }))
        .unwrap();

        assert_eq!(dv.spec.pvc_name, None);
        assert_eq!(dv.spec.resources.requests.storage, "10Gi");
        assert!(!dv.is_created());
        assert!(!dv.is_ready());
        assert_eq!(DiskVolume::default_pvc_name("d1"), "tpl-d1");
    }

    #[test]
    fn test_status_serialization() {
        let status = DiskVolumeStatus {
            created: true,
            ready: true,
            owner: "vm-1".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"created": true, "ready": true, "owner": "vm-1"}));
    }
}
