//! OperatorConfig CRD
//!
//! Singleton resource that aggregates the cluster-sync configuration:
//! object storage locations, backups, restores and backup schedules.
//! An external operator acts on it; this crate only reads and writes it.

use super::duration::GoDuration;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default name of the singleton
pub const OPERATOR_CONFIG_NAME: &str = "operatorconfig";

/// Default namespace of the singleton
pub const OPERATOR_CONFIG_NAMESPACE: &str = "default";

/// Backup TTL applied when a request leaves it empty
pub const DEFAULT_BACKUP_TTL: GoDuration = GoDuration::from_hours(720);

// =============================================================================
// OperatorConfig CRD
// =============================================================================

/// OperatorConfig holds four ordered, name-keyed collections.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "clustersync.kubesphere.io",
    version = "v1",
    kind = "OperatorConfig",
    plural = "operatorconfigs",
    shortname = "opcfg",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfigSpec {
    /// Object storage locations backups are written to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_configs: Vec<StorageConfig>,

    /// One-time or on-demand backups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backup_configs: Vec<BackupConfig>,

    /// Restores from a named backup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restore_configs: Vec<RestoreConfig>,

    /// Cron-driven backups built from a template
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule_configs: Vec<ScheduleConfig>,
}

impl OperatorConfig {
    /// Empty singleton, used before the first create
    pub fn empty(name: &str, namespace: &str) -> Self {
        let mut config = OperatorConfig::new(name, OperatorConfigSpec::default());
        config.metadata.namespace = Some(namespace.to_string());
        config
    }
}

// =============================================================================
// Entries
// =============================================================================

/// Object storage location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub storage_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    /// Endpoint address for S3-compatible stores
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_key: String,

    /// At most one storage should be the default; not enforced here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

/// Backup parameters shared by backups and schedule templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_namespaces: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_namespaces: Option<Vec<String>>,

    #[serde(default)]
    pub ttl: GoDuration,

    /// Name of a StorageConfig; not resolved by this crate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_volumes_to_fs_backup: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_snapshot_locations: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_move_data: Option<bool>,
}

/// Named backup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    pub backup_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_one_time: Option<bool>,

    #[serde(default)]
    pub spec: BackupSpec,
}

/// Named restore of an existing backup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestoreConfig {
    pub restore_name: String,

    pub backup_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_namespaces: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_namespaces: Option<Vec<String>>,
}

/// Named backup schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub schedule_name: String,

    /// Cron expression, 5 fields or 6 with leading seconds
    pub schedule: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,

    #[serde(default)]
    pub template: BackupSpec,
}

// =============================================================================
// Collection access
// =============================================================================

/// An element of one of the four OperatorConfig collections.
///
/// All collections share the same name-keyed CRUD shape; this trait lets
/// the store implement it once.
pub trait ConfigEntry: Clone + Send + Sync + 'static {
    /// Kind used in error messages, e.g. `StorageConfig`
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn collection(spec: &OperatorConfigSpec) -> &Vec<Self>;

    fn collection_mut(spec: &mut OperatorConfigSpec) -> &mut Vec<Self>;
}

impl ConfigEntry for StorageConfig {
    const KIND: &'static str = "StorageConfig";

    fn name(&self) -> &str {
        &self.storage_name
    }

    fn collection(spec: &OperatorConfigSpec) -> &Vec<Self> {
        &spec.storage_configs
    }

    fn collection_mut(spec: &mut OperatorConfigSpec) -> &mut Vec<Self> {
        &mut spec.storage_configs
    }
}

impl ConfigEntry for BackupConfig {
    const KIND: &'static str = "BackupConfig";

    fn name(&self) -> &str {
        &self.backup_name
    }

    fn collection(spec: &OperatorConfigSpec) -> &Vec<Self> {
        &spec.backup_configs
    }

    fn collection_mut(spec: &mut OperatorConfigSpec) -> &mut Vec<Self> {
        &mut spec.backup_configs
    }
}

impl ConfigEntry for RestoreConfig {
    const KIND: &'static str = "RestoreConfig";

    fn name(&self) -> &str {
        &self.restore_name
    }

    fn collection(spec: &OperatorConfigSpec) -> &Vec<Self> {
        &spec.restore_configs
    }

    fn collection_mut(spec: &mut OperatorConfigSpec) -> &mut Vec<Self> {
        &mut spec.restore_configs
    }
}

impl ConfigEntry for ScheduleConfig {
    const KIND: &'static str = "ScheduleConfig";

    fn name(&self) -> &str {
        &self.schedule_name
    }

    fn collection(spec: &OperatorConfigSpec) -> &Vec<Self> {
        &spec.schedule_configs
    }

    fn collection_mut(spec: &mut OperatorConfigSpec) -> &mut Vec<Self> {
        &mut spec.schedule_configs
    }
}
