//! Error types for the ClusterSync operator
//!
//! Provides structured error types for the aggregated-config store, the
//! validation kit, the REST handlers and the DiskVolume controller.

use std::time::Duration;
use thiserror::Error;

/// Distinguishes the two legacy status codes used for validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// Malformed value: bad IP, CIDR, cron, duration, overlapping namespaces
    Semantic,
    /// Value exceeds the declared maximum length of its field
    Length,
}

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("{reason}")]
    Validation { kind: ValidationKind, reason: String },

    #[error("{0}")]
    Decode(String),

    // =========================================================================
    // Aggregated Config Errors
    // =========================================================================
    #[error("{kind} \"{name}\" duplicated")]
    Duplicated { kind: &'static str, name: String },

    #[error("OperatorConfig is not created")]
    OperatorConfigNotCreated,

    #[error("{kind} \"{name}\" is not created")]
    EntryNotFound { kind: &'static str, name: String },

    #[error("Conflict writing {kind}/{name}: {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("No default StorageClass found in cluster")]
    NoDefaultStorageClass,

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Duration parse error: {0}")]
    DurationParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Semantic validation failure (HTTP 400)
    pub fn invalid(reason: impl Into<String>) -> Self {
        Error::Validation {
            kind: ValidationKind::Semantic,
            reason: reason.into(),
        }
    }

    /// Length validation failure (HTTP 403)
    pub fn too_long(reason: impl Into<String>) -> Self {
        Error::Validation {
            kind: ValidationKind::Length,
            reason: reason.into(),
        }
    }

    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Kube(_) | Error::Conflict { .. } => ErrorAction::RequeueWithBackoff,

            // Cluster has to be fixed by an administrator
            Error::NoDefaultStorageClass => ErrorAction::RequeueAfter(Duration::from_secs(60)),

            // Configuration/validation errors - don't retry automatically
            Error::Configuration(_)
            | Error::Validation { .. }
            | Error::Decode(_)
            | Error::DurationParse(_) => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Optimistic-concurrency rejection from the API server
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict { .. } => true,
            Error::Kube(kube::Error::Api(resp)) => resp.code == 409 && resp.reason == "Conflict",
            _ => false,
        }
    }

    /// Create rejected because the object is already present
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::ResourceExists { .. } => true,
            Error::Kube(kube::Error::Api(resp)) => resp.reason == "AlreadyExists",
            _ => false,
        }
    }

    /// Lookup failed because the object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::EntryNotFound { .. } | Error::ResourceNotFound { .. } => true,
            Error::Kube(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> Error {
        Error::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{} error", reason),
            reason: reason.into(),
            code,
        }))
    }

    #[test]
    fn test_error_messages() {
        let err = Error::Duplicated {
            kind: "BackupConfig",
            name: "daily".into(),
        };
        assert_eq!(err.to_string(), "BackupConfig \"daily\" duplicated");

        let err = Error::EntryNotFound {
            kind: "StorageConfig",
            name: "s1".into(),
        };
        assert_eq!(err.to_string(), "StorageConfig \"s1\" is not created");

        assert_eq!(
            Error::OperatorConfigNotCreated.to_string(),
            "OperatorConfig is not created"
        );
        assert_eq!(Error::invalid("Invalid Port : 0").to_string(), "Invalid Port : 0");
    }

    #[test]
    fn test_error_actions() {
        assert_eq!(
            Error::NoDefaultStorageClass.action(),
            ErrorAction::RequeueAfter(Duration::from_secs(60))
        );
        assert_eq!(
            Error::Configuration("bad config".into()).action(),
            ErrorAction::NoRequeue
        );
        assert_eq!(
            api_error(500, "InternalError").action(),
            ErrorAction::RequeueWithBackoff
        );
    }

    #[test]
    fn test_error_retryable() {
        assert!(api_error(409, "Conflict").is_retryable());
        assert!(!Error::too_long("x").is_retryable());
    }

    #[test]
    fn test_kube_reason_classification() {
        assert!(api_error(409, "Conflict").is_conflict());
        assert!(!api_error(409, "Conflict").is_already_exists());
        assert!(api_error(409, "AlreadyExists").is_already_exists());
        assert!(!api_error(409, "AlreadyExists").is_conflict());
        assert!(api_error(404, "NotFound").is_not_found());
        assert!(Error::Conflict {
            kind: "OperatorConfig".into(),
            name: "operatorconfig".into(),
            message: "stale".into(),
        }
        .is_conflict());
    }
}
