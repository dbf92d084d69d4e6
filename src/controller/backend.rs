//! Kubernetes implementation of [`DiskVolumeBackend`]

use crate::crd::DiskVolume;
use crate::domain::{CreateOutcome, DataVolume, DiskVolumeBackend};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, warn};

/// Annotation marking the cluster default StorageClass
pub const DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";
const BETA_DEFAULT_CLASS_ANNOTATION: &str = "storageclass.beta.kubernetes.io/is-default-class";

/// Reporting component on emitted Events
pub const CONTROLLER_NAME: &str = "diskvolume-controller";

pub struct KubeDiskVolumeBackend {
    client: Client,
    recorder: Recorder,
}

impl KubeDiskVolumeBackend {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client.clone(), reporter),
            client,
        }
    }
}

/// Name of the StorageClass annotated as default, if any
pub fn find_default_class(classes: &[StorageClass]) -> Option<String> {
    classes
        .iter()
        .find(|sc| {
            let annotations = sc.annotations();
            [DEFAULT_CLASS_ANNOTATION, BETA_DEFAULT_CLASS_ANNOTATION]
                .iter()
                .any(|key| annotations.get(*key).map(String::as_str) == Some("true"))
        })
        .map(|sc| sc.name_any())
}

/// Fold AlreadyExists into a successful outcome
fn create_outcome<T>(result: std::result::Result<T, kube::Error>) -> Result<CreateOutcome> {
    match result {
        Ok(_) => Ok(CreateOutcome::Created),
        Err(e) => {
            let err = Error::from(e);
            if err.is_already_exists() {
                Ok(CreateOutcome::AlreadyExists)
            } else {
                Err(err)
            }
        }
    }
}

#[async_trait]
impl DiskVolumeBackend for KubeDiskVolumeBackend {
    async fn default_storage_class(&self) -> Result<Option<String>> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        let classes = api.list(&ListParams::default()).await?;
        Ok(find_default_class(&classes.items))
    }

    async fn create_pvc(&self, namespace: &str, pvc: &PersistentVolumeClaim) -> Result<CreateOutcome> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let outcome = create_outcome(api.create(&PostParams::default(), pvc).await)?;
        debug!("PVC {}/{}: {:?}", namespace, pvc.name_any(), outcome);
        Ok(outcome)
    }

    async fn create_data_volume(&self, namespace: &str, dv: &DataVolume) -> Result<CreateOutcome> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &DataVolume::api_resource());
        let object: DynamicObject = serde_json::from_value(serde_json::to_value(dv)?)?;
        let outcome = create_outcome(api.create(&PostParams::default(), &object).await)?;
        debug!(
            "DataVolume {}/{}: {:?}",
            namespace,
            dv.metadata.name.as_deref().unwrap_or_default(),
            outcome
        );
        Ok(outcome)
    }

    async fn update_disk_volume(&self, disk: &DiskVolume) -> Result<DiskVolume> {
        let namespace = disk.namespace().unwrap_or_default();
        let api: Api<DiskVolume> = Api::namespaced(self.client.clone(), &namespace);
        Ok(api
            .replace(&disk.name_any(), &PostParams::default(), disk)
            .await?)
    }

    async fn update_status(&self, disk: &DiskVolume) -> Result<DiskVolume> {
        let namespace = disk.namespace().unwrap_or_default();
        let api: Api<DiskVolume> = Api::namespaced(self.client.clone(), &namespace);

        // resourceVersion makes the patch conditional on the observed object
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": disk.resource_version() },
            "status": disk.status,
        });
        Ok(api
            .patch_status(&disk.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }

    async fn publish_event(&self, disk: &DiskVolume, warning: bool, reason: &str, note: &str) {
        let event = Event {
            type_: if warning {
                EventType::Warning
            } else {
                EventType::Normal
            },
            reason: reason.to_string(),
            note: Some(note.to_string()),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &disk.object_ref(&())).await {
            warn!(
                reason,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::core::ErrorResponse;
    use std::collections::BTreeMap;

    fn class(name: &str, annotations: &[(&str, &str)]) -> StorageClass {
        StorageClass {
            metadata: ObjectMeta {
                name: Some(name.into()),
                annotations: Some(
                    annotations
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            provisioner: "csi.example.com".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_default_class() {
        let classes = vec![
            class("slow", &[]),
            class("fast", &[(DEFAULT_CLASS_ANNOTATION, "false")]),
            class("standard", &[(DEFAULT_CLASS_ANNOTATION, "true")]),
        ];
        assert_eq!(find_default_class(&classes).as_deref(), Some("standard"));

        let legacy = vec![class("old", &[(BETA_DEFAULT_CLASS_ANNOTATION, "true")])];
        assert_eq!(find_default_class(&legacy).as_deref(), Some("old"));

        assert_eq!(find_default_class(&classes[..2]), None);
    }

    #[test]
    fn test_create_outcome() {
        let exists = kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "already exists".into(),
            reason: "AlreadyExists".into(),
            code: 409,
        });
        assert_eq!(
            create_outcome::<()>(Err(exists)).unwrap(),
            CreateOutcome::AlreadyExists
        );
        assert_eq!(create_outcome(Ok(())).unwrap(), CreateOutcome::Created);

        let forbidden = kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "forbidden".into(),
            reason: "Forbidden".into(),
            code: 403,
        });
        assert!(create_outcome::<()>(Err(forbidden)).is_err());
    }
}
