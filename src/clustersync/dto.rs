//! ClusterSync request and response contracts
//!
//! Three shapes per entity: a *Request* for create, a *ModifyRequest* with
//! patch semantics (empty string / `None` means "unchanged") and a
//! *Response* with normalized fields (lists never null, tri-state booleans
//! projected to plain booleans, durations in Go form).

use crate::crd::{
    BackupConfig, BackupSpec, ConfigEntry, RestoreConfig, ScheduleConfig, StorageConfig,
};
use crate::error::Result;
use crate::validation::{self, FieldLimit};
use serde::{Deserialize, Serialize};

// =============================================================================
// Field Limits
// =============================================================================

/// Declared bounds of every request field
pub mod limits {
    use super::FieldLimit;

    pub const STORAGE_NAME: FieldLimit = FieldLimit::max_len("StorageName", 32);
    pub const PROVIDER: FieldLimit = FieldLimit::max_len("Provider", 32);
    pub const BUCKET: FieldLimit = FieldLimit::max_len("Bucket", 32);
    pub const PREFIX: FieldLimit = FieldLimit::max_len("Prefix", 32);
    pub const REGION: FieldLimit = FieldLimit::max_len("Region", 32);
    pub const IP: FieldLimit = FieldLimit::named("IP");
    pub const PORT: FieldLimit = FieldLimit::range("Port", 1, 65535);
    pub const ACCESS_KEY: FieldLimit = FieldLimit::max_len("AccessKey", 32);
    pub const SECRET_KEY: FieldLimit = FieldLimit::max_len("SecretKey", 32);

    pub const BACKUP_NAME: FieldLimit = FieldLimit::max_len("BackupName", 32);
    pub const IS_ONE_TIME: FieldLimit = FieldLimit::named("IsOneTime");
    pub const TTL: FieldLimit = FieldLimit::named("TTL");
    pub const STORAGE_LOCATION: FieldLimit = FieldLimit::max_len("StorageLocation", 32);

    pub const RESTORE_NAME: FieldLimit = FieldLimit::max_len("RestoreName", 32);

    pub const SCHEDULE_NAME: FieldLimit = FieldLimit::max_len("ScheduleName", 32);
    pub const SCHEDULE: FieldLimit = FieldLimit::named("Schedule");
}

// =============================================================================
// Shared Responses
// =============================================================================

/// Name of a created entry, keyed by the entity's name field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameResponse(serde_json::Map<String, serde_json::Value>);

impl NameResponse {
    pub fn new(key: &str, name: impl Into<String>) -> Self {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), serde_json::Value::String(name.into()));
        Self(map)
    }

    pub fn name(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }
}

/// Listing of one collection, in singleton order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub total_count: usize,
    pub items: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            total_count: items.len(),
            items,
        }
    }
}

/// Ties a stored entry to its response shape
pub trait EntryResource: ConfigEntry {
    type Response: Serialize + Send;

    /// JSON key of the name in create responses
    const NAME_KEY: &'static str;

    fn to_response(&self) -> Self::Response;
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRequest {
    #[serde(default)]
    pub storage_name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl StorageRequest {
    pub fn validate(&self) -> Result<()> {
        validation::valid_string(&limits::STORAGE_NAME, &self.storage_name)?;
        validate_storage_fields(
            &self.provider,
            &self.bucket,
            &self.prefix,
            &self.region,
            &self.ip,
            self.port,
            &self.access_key,
            &self.secret_key,
        )
    }

    /// Caller must have validated the request
    pub fn into_config(self) -> StorageConfig {
        StorageConfig {
            storage_name: self.storage_name,
            provider: self.provider,
            bucket: self.bucket,
            prefix: self.prefix,
            region: self.region,
            ip: self.ip,
            port: self.port.map(|p| p as i32),
            access_key: self.access_key,
            secret_key: self.secret_key,
            is_default: self.is_default,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageModifyRequest {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl StorageModifyRequest {
    pub fn validate(&self) -> Result<()> {
        validate_storage_fields(
            &self.provider,
            &self.bucket,
            &self.prefix,
            &self.region,
            &self.ip,
            self.port,
            &self.access_key,
            &self.secret_key,
        )
    }

    pub fn apply_to(&self, config: &mut StorageConfig) {
        overwrite(&mut config.provider, &self.provider);
        overwrite(&mut config.bucket, &self.bucket);
        overwrite(&mut config.prefix, &self.prefix);
        overwrite(&mut config.region, &self.region);
        overwrite(&mut config.ip, &self.ip);
        overwrite(&mut config.access_key, &self.access_key);
        overwrite(&mut config.secret_key, &self.secret_key);
        if let Some(port) = self.port {
            config.port = Some(port as i32);
        }
        if self.is_default.is_some() {
            config.is_default = self.is_default;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_storage_fields(
    provider: &str,
    bucket: &str,
    prefix: &str,
    region: &str,
    ip: &str,
    port: Option<i64>,
    access_key: &str,
    secret_key: &str,
) -> Result<()> {
    validation::valid_optional_string(&limits::PROVIDER, provider)?;
    validation::valid_optional_string(&limits::BUCKET, bucket)?;
    validation::valid_optional_string(&limits::PREFIX, prefix)?;
    validation::valid_optional_string(&limits::REGION, region)?;
    validation::valid_optional_ip(&limits::IP, ip)?;
    validation::valid_optional_port(&limits::PORT, port)?;
    validation::valid_length(&limits::ACCESS_KEY, access_key)?;
    validation::valid_length(&limits::SECRET_KEY, secret_key)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageResponse {
    pub storage_name: String,
    pub provider: String,
    pub bucket: String,
    pub prefix: String,
    pub region: String,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    pub access_key: String,
    pub secret_key: String,
    pub is_default: bool,
}

impl EntryResource for StorageConfig {
    type Response = StorageResponse;
    const NAME_KEY: &'static str = "storageName";

    fn to_response(&self) -> StorageResponse {
        StorageResponse {
            storage_name: self.storage_name.clone(),
            provider: self.provider.clone(),
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            region: self.region.clone(),
            ip: self.ip.clone(),
            port: self.port,
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            is_default: self.is_default.unwrap_or(false),
        }
    }
}

// =============================================================================
// Backup
// =============================================================================

/// Full backup request. Also used as the schedule template, where
/// `backupName` and `isOneTime` are not required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    #[serde(default)]
    pub backup_name: String,
    #[serde(default)]
    pub is_one_time: Option<bool>,
    #[serde(default)]
    pub included_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub ttl: String,
    #[serde(default)]
    pub storage_location: String,
    #[serde(default)]
    pub default_volumes_to_fs_backup: Option<bool>,
    #[serde(default)]
    pub volume_snapshot_locations: Option<Vec<String>>,
    #[serde(default)]
    pub snapshot_move_data: Option<bool>,
}

impl BackupRequest {
    /// `top_level` is false when validating a schedule template
    pub fn validate(&self, top_level: bool) -> Result<()> {
        if top_level {
            validation::valid_string(&limits::BACKUP_NAME, &self.backup_name)?;
            if self.is_one_time.is_none() {
                return Err(crate::error::Error::invalid(format!(
                    "Invalid {} : must be set",
                    limits::IS_ONE_TIME.field
                )));
            }
        }
        validation::valid_string(&limits::STORAGE_LOCATION, &self.storage_location)?;
        validation::valid_ttl(&limits::TTL, &self.ttl)?;
        validation::valid_namespace_range(
            self.included_namespaces.as_deref(),
            self.excluded_namespaces.as_deref(),
        )?;
        validation::valid_volume_locations(
            self.snapshot_move_data.unwrap_or(false),
            self.volume_snapshot_locations.as_deref(),
        )?;
        Ok(())
    }

    /// Translate to the stored spec; empty TTL becomes the default
    pub fn to_spec(&self) -> Result<BackupSpec> {
        let ttl = validation::valid_ttl(&limits::TTL, &self.ttl)?;
        let volume_snapshot_locations = match &self.volume_snapshot_locations {
            Some(locations) => Some(validation::valid_volume_locations(
                self.snapshot_move_data.unwrap_or(false),
                Some(locations.as_slice()),
            )?),
            None => None,
        };
        Ok(BackupSpec {
            included_namespaces: self.included_namespaces.clone(),
            excluded_namespaces: self.excluded_namespaces.clone(),
            ttl,
            storage_location: self.storage_location.clone(),
            default_volumes_to_fs_backup: self.default_volumes_to_fs_backup,
            volume_snapshot_locations,
            snapshot_move_data: self.snapshot_move_data,
        })
    }

    pub fn into_config(self) -> Result<BackupConfig> {
        let spec = self.to_spec()?;
        Ok(BackupConfig {
            backup_name: self.backup_name,
            is_one_time: self.is_one_time,
            spec,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupModifyRequest {
    #[serde(default)]
    pub is_one_time: Option<bool>,
    #[serde(default)]
    pub included_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub ttl: String,
    #[serde(default)]
    pub storage_location: String,
    #[serde(default)]
    pub default_volumes_to_fs_backup: Option<bool>,
    #[serde(default)]
    pub volume_snapshot_locations: Option<Vec<String>>,
    #[serde(default)]
    pub snapshot_move_data: Option<bool>,
}

impl BackupModifyRequest {
    /// Checks the fields present in the request
    pub fn validate(&self) -> Result<()> {
        if !self.storage_location.is_empty() {
            validation::valid_string(&limits::STORAGE_LOCATION, &self.storage_location)?;
        }
        if !self.ttl.is_empty() {
            validation::valid_ttl(&limits::TTL, &self.ttl)?;
        }
        validation::valid_namespace_range(
            self.included_namespaces.as_deref(),
            self.excluded_namespaces.as_deref(),
        )?;
        if let Some(locations) = &self.volume_snapshot_locations {
            validation::valid_volume_locations(false, Some(locations.as_slice()))?;
        }
        Ok(())
    }

    /// Merge into a stored spec, then re-check the rules that span fields
    pub fn apply_to(&self, spec: &mut BackupSpec) -> Result<()> {
        if self.included_namespaces.is_some() {
            spec.included_namespaces = self.included_namespaces.clone();
        }
        if self.excluded_namespaces.is_some() {
            spec.excluded_namespaces = self.excluded_namespaces.clone();
        }
        if !self.ttl.is_empty() {
            spec.ttl = validation::valid_ttl(&limits::TTL, &self.ttl)?;
        }
        overwrite(&mut spec.storage_location, &self.storage_location);
        if self.default_volumes_to_fs_backup.is_some() {
            spec.default_volumes_to_fs_backup = self.default_volumes_to_fs_backup;
        }
        if self.snapshot_move_data.is_some() {
            spec.snapshot_move_data = self.snapshot_move_data;
        }
        if self.volume_snapshot_locations.is_some() {
            spec.volume_snapshot_locations = self.volume_snapshot_locations.clone();
        }

        validation::valid_namespace_range(
            spec.included_namespaces.as_deref(),
            spec.excluded_namespaces.as_deref(),
        )?;
        let locations = validation::valid_volume_locations(
            spec.snapshot_move_data.unwrap_or(false),
            spec.volume_snapshot_locations.as_deref(),
        )?;
        if spec.volume_snapshot_locations.is_some() {
            spec.volume_snapshot_locations = Some(locations);
        }
        Ok(())
    }

    pub fn apply_to_config(&self, config: &mut BackupConfig) -> Result<()> {
        if self.is_one_time.is_some() {
            config.is_one_time = self.is_one_time;
        }
        self.apply_to(&mut config.spec)
    }
}

/// Normalized backup parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpecResponse {
    pub included_namespaces: Vec<String>,
    pub excluded_namespaces: Vec<String>,
    pub ttl: String,
    pub storage_location: String,
    pub default_volumes_to_fs_backup: bool,
    pub volume_snapshot_locations: Vec<String>,
    pub snapshot_move_data: bool,
}

impl From<&BackupSpec> for BackupSpecResponse {
    fn from(spec: &BackupSpec) -> Self {
        Self {
            included_namespaces: spec.included_namespaces.clone().unwrap_or_default(),
            excluded_namespaces: spec.excluded_namespaces.clone().unwrap_or_default(),
            ttl: spec.ttl.to_string(),
            storage_location: spec.storage_location.clone(),
            default_volumes_to_fs_backup: spec.default_volumes_to_fs_backup.unwrap_or(false),
            volume_snapshot_locations: spec.volume_snapshot_locations.clone().unwrap_or_default(),
            snapshot_move_data: spec.snapshot_move_data.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResponse {
    pub backup_name: String,
    pub is_one_time: bool,
    #[serde(flatten)]
    pub spec: BackupSpecResponse,
}

impl EntryResource for BackupConfig {
    type Response = BackupResponse;
    const NAME_KEY: &'static str = "backupName";

    fn to_response(&self) -> BackupResponse {
        BackupResponse {
            backup_name: self.backup_name.clone(),
            is_one_time: self.is_one_time.unwrap_or(false),
            spec: BackupSpecResponse::from(&self.spec),
        }
    }
}

// =============================================================================
// Restore
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    #[serde(default)]
    pub restore_name: String,
    #[serde(default)]
    pub backup_name: String,
    #[serde(default)]
    pub included_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_namespaces: Option<Vec<String>>,
}

impl RestoreRequest {
    pub fn validate(&self) -> Result<()> {
        validation::valid_string(&limits::RESTORE_NAME, &self.restore_name)?;
        validation::valid_string(&limits::BACKUP_NAME, &self.backup_name)?;
        validation::valid_namespace_range(
            self.included_namespaces.as_deref(),
            self.excluded_namespaces.as_deref(),
        )
    }

    pub fn into_config(self) -> RestoreConfig {
        RestoreConfig {
            restore_name: self.restore_name,
            backup_name: self.backup_name,
            included_namespaces: self.included_namespaces,
            excluded_namespaces: self.excluded_namespaces,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreModifyRequest {
    #[serde(default)]
    pub backup_name: String,
    #[serde(default)]
    pub included_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_namespaces: Option<Vec<String>>,
}

impl RestoreModifyRequest {
    pub fn validate(&self) -> Result<()> {
        if !self.backup_name.is_empty() {
            validation::valid_string(&limits::BACKUP_NAME, &self.backup_name)?;
        }
        validation::valid_namespace_range(
            self.included_namespaces.as_deref(),
            self.excluded_namespaces.as_deref(),
        )
    }

    pub fn apply_to(&self, config: &mut RestoreConfig) -> Result<()> {
        overwrite(&mut config.backup_name, &self.backup_name);
        if self.included_namespaces.is_some() {
            config.included_namespaces = self.included_namespaces.clone();
        }
        if self.excluded_namespaces.is_some() {
            config.excluded_namespaces = self.excluded_namespaces.clone();
        }
        validation::valid_namespace_range(
            config.included_namespaces.as_deref(),
            config.excluded_namespaces.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub restore_name: String,
    pub backup_name: String,
    pub included_namespaces: Vec<String>,
    pub excluded_namespaces: Vec<String>,
}

impl EntryResource for RestoreConfig {
    type Response = RestoreResponse;
    const NAME_KEY: &'static str = "restoreName";

    fn to_response(&self) -> RestoreResponse {
        RestoreResponse {
            restore_name: self.restore_name.clone(),
            backup_name: self.backup_name.clone(),
            included_namespaces: self.included_namespaces.clone().unwrap_or_default(),
            excluded_namespaces: self.excluded_namespaces.clone().unwrap_or_default(),
        }
    }
}

// =============================================================================
// Schedule
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[serde(default)]
    pub schedule_name: String,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub template: BackupRequest,
}

impl ScheduleRequest {
    pub fn validate(&self) -> Result<()> {
        validation::valid_string(&limits::SCHEDULE_NAME, &self.schedule_name)?;
        validation::valid_cron(&limits::SCHEDULE, &self.schedule)?;
        self.template.validate(false)
    }

    pub fn into_config(self) -> Result<ScheduleConfig> {
        let template = self.template.to_spec()?;
        Ok(ScheduleConfig {
            schedule_name: self.schedule_name,
            schedule: self.schedule,
            paused: self.paused,
            template,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleModifyRequest {
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub paused: Option<bool>,
    #[serde(default)]
    pub template: Option<BackupModifyRequest>,
}

impl ScheduleModifyRequest {
    pub fn validate(&self) -> Result<()> {
        if !self.schedule.is_empty() {
            validation::valid_cron(&limits::SCHEDULE, &self.schedule)?;
        }
        match &self.template {
            Some(template) => {
                if template.is_one_time.is_some() {
                    return Err(crate::error::Error::invalid(format!(
                        "Invalid {} : not allowed in a schedule template",
                        limits::IS_ONE_TIME.field
                    )));
                }
                template.validate()
            }
            None => Ok(()),
        }
    }

    pub fn apply_to(&self, config: &mut ScheduleConfig) -> Result<()> {
        overwrite(&mut config.schedule, &self.schedule);
        if self.paused.is_some() {
            config.paused = self.paused;
        }
        match &self.template {
            Some(template) => template.apply_to(&mut config.template),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub schedule_name: String,
    pub schedule: String,
    pub paused: bool,
    pub template: BackupSpecResponse,
}

impl EntryResource for ScheduleConfig {
    type Response = ScheduleResponse;
    const NAME_KEY: &'static str = "scheduleName";

    fn to_response(&self) -> ScheduleResponse {
        ScheduleResponse {
            schedule_name: self.schedule_name.clone(),
            schedule: self.schedule.clone(),
            paused: self.paused.unwrap_or(false),
            template: BackupSpecResponse::from(&self.template),
        }
    }
}

/// Patch a scalar: empty means unchanged
fn overwrite(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::DEFAULT_BACKUP_TTL;
    use crate::error::{Error, ValidationKind};
    use assert_matches::assert_matches;

    fn backup_request(name: &str) -> BackupRequest {
        BackupRequest {
            backup_name: name.into(),
            is_one_time: Some(false),
            storage_location: "s1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_storage_request_decoding() {
        let req: StorageRequest = serde_json::from_value(serde_json::json!({
            "storageName": "s1",
            "provider": "aws",
            "bucket": "b",
            "port": 9000,
            "isDefault": true
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let config = req.into_config();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.is_default, Some(true));
        assert_eq!(config.region, "");
    }

    #[test]
    fn test_storage_validation_kinds() {
        let mut req = StorageRequest {
            storage_name: "s1".into(),
            ..Default::default()
        };
        req.bucket = "b".repeat(40);
        assert_matches!(
            req.validate(),
            Err(Error::Validation { kind: ValidationKind::Length, .. })
        );

        req.bucket = "b".into();
        req.ip = "not-an-ip".into();
        assert_matches!(
            req.validate(),
            Err(Error::Validation { kind: ValidationKind::Semantic, .. })
        );

        req.ip = String::new();
        req.port = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_storage_modify_patches_only_present_fields() {
        let mut config = StorageConfig {
            storage_name: "s1".into(),
            provider: "aws".into(),
            bucket: "b".into(),
            port: Some(9000),
            is_default: Some(true),
            ..Default::default()
        };
        let original = config.clone();

        StorageModifyRequest::default().apply_to(&mut config);
        assert_eq!(config, original);

        let patch = StorageModifyRequest {
            region: "us-east-1".into(),
            is_default: Some(false),
            ..Default::default()
        };
        patch.apply_to(&mut config);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.bucket, "b");
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.is_default, Some(false));
    }

    #[test]
    fn test_backup_request_defaults_ttl() {
        let config = backup_request("daily").into_config().unwrap();
        assert_eq!(config.spec.ttl, DEFAULT_BACKUP_TTL);
        assert_eq!(config.spec.included_namespaces, None);
        assert_eq!(config.spec.snapshot_move_data, None);

        let response = config.to_response();
        assert_eq!(response.spec.ttl, "720h0m0s");
        assert!(response.spec.included_namespaces.is_empty());
        assert!(!response.spec.snapshot_move_data);
    }

    #[test]
    fn test_backup_top_level_requirements() {
        let mut req = backup_request("");
        assert!(req.validate(true).is_err());
        assert!(req.validate(false).is_ok());

        req.backup_name = "daily".into();
        req.is_one_time = None;
        assert_eq!(
            req.validate(true).unwrap_err().to_string(),
            "Invalid IsOneTime : must be set"
        );
        assert!(req.validate(false).is_ok());

        req.storage_location = String::new();
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn test_backup_snapshot_rules() {
        let mut req = backup_request("daily");
        req.snapshot_move_data = Some(true);
        assert!(req.validate(true).is_err());

        req.volume_snapshot_locations = Some(vec!["vsl-a".into(), "vsl-a".into()]);
        assert!(req.validate(true).is_ok());
        let config = req.into_config().unwrap();
        assert_eq!(config.spec.volume_snapshot_locations, Some(vec!["vsl-a".to_string()]));
    }

    #[test]
    fn test_backup_modify_rechecks_merged_namespaces() {
        let mut config = BackupConfig {
            backup_name: "daily".into(),
            is_one_time: Some(false),
            spec: BackupSpec {
                included_namespaces: Some(vec!["a".into(), "b".into()]),
                storage_location: "s1".into(),
                ttl: DEFAULT_BACKUP_TTL,
                ..Default::default()
            },
        };

        let patch = BackupModifyRequest {
            excluded_namespaces: Some(vec!["b".into()]),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
        assert!(patch.apply_to_config(&mut config).is_err());

        let patch = BackupModifyRequest {
            ttl: "24h".into(),
            storage_location: "s2".into(),
            excluded_namespaces: Some(vec![]),
            ..Default::default()
        };
        patch.apply_to_config(&mut config).unwrap();
        assert_eq!(config.spec.ttl.to_string(), "24h0m0s");
        assert_eq!(config.spec.storage_location, "s2");
        assert_eq!(config.spec.excluded_namespaces, Some(vec![]));
        assert_eq!(config.spec.included_namespaces.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_schedule_template_validated_as_nested_backup() {
        let req = ScheduleRequest {
            schedule_name: "nightly".into(),
            schedule: "0 2 * * *".into(),
            paused: None,
            template: BackupRequest {
                storage_location: "s1".into(),
                ..Default::default()
            },
        };
        assert!(req.validate().is_ok());

        let config = req.into_config().unwrap();
        let response = config.to_response();
        assert!(!response.paused);
        assert_eq!(response.template.ttl, "720h0m0s");

        let bad = ScheduleRequest {
            schedule: "* * *".into(),
            ..ScheduleRequest {
                schedule_name: "nightly".into(),
                ..Default::default()
            }
        };
        assert_eq!(bad.validate().unwrap_err().to_string(), "Invalid Schedule : * * *");
    }

    #[test]
    fn test_schedule_modify_rejects_one_time_template() {
        let patch: ScheduleModifyRequest = serde_json::from_value(serde_json::json!({
            "template": {"isOneTime": true, "ttl": "48h"}
        }))
        .unwrap();
        let err = patch.validate().unwrap_err();
        assert_matches!(err, Error::Validation { kind: ValidationKind::Semantic, .. });
        assert_eq!(
            err.to_string(),
            "Invalid IsOneTime : not allowed in a schedule template"
        );

        let patch: ScheduleModifyRequest = serde_json::from_value(serde_json::json!({
            "template": {"ttl": "48h"}
        }))
        .unwrap();
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_response_shapes() {
        let restore = RestoreConfig {
            restore_name: "r1".into(),
            backup_name: "daily".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(restore.to_response()).unwrap();
        assert_eq!(json["includedNamespaces"], serde_json::json!([]));
        assert_eq!(json["backupName"], "daily");

        let backup = backup_request("daily").into_config().unwrap();
        let json = serde_json::to_value(backup.to_response()).unwrap();
        assert_eq!(json["backupName"], "daily");
        assert_eq!(json["ttl"], "720h0m0s");
        assert_eq!(json["isOneTime"], false);

        let name = NameResponse::new(StorageConfig::NAME_KEY, "s1");
        assert_eq!(serde_json::to_value(&name).unwrap(), serde_json::json!({"storageName": "s1"}));

        let list = ListResponse::new(vec![1, 2, 3]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["total_count"], 3);
    }
}
