//! ClusterSync REST handlers
//!
//! CRUD endpoints for `storageconfigs`, `backupconfigs`, `restoreconfigs`
//! and `scheduleconfigs`. Status codes:
//!
//! | Outcome                          | Status |
//! |----------------------------------|--------|
//! | success                          | 200    |
//! | semantic validation failure      | 400    |
//! | length validation failure        | 403    |
//! | missing entry on get             | 404    |
//! | missing entry on update          | 500    |
//! | missing OperatorConfig           | 500    |
//! | anything else                    | 500    |
//!
//! Deleting a name that is not stored, or deleting before the
//! OperatorConfig exists, succeeds.
//!
//! Validation failures carry a `{"reason": ...}` JSON body; other failures
//! a plain-text message.

use crate::clustersync::{
    BackupModifyRequest, BackupRequest, EntryResource, ListResponse, NameResponse,
    RestoreModifyRequest, RestoreRequest, ScheduleModifyRequest, ScheduleRequest,
    StorageModifyRequest, StorageRequest,
};
use crate::crd::{BackupConfig, RestoreConfig, ScheduleConfig, StorageConfig};
use crate::error::{Error, Result, ValidationKind};
use crate::metrics;
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::rest::AppState;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Body of a validation failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonResponse {
    pub reason: String,
}

// =============================================================================
// Routes
// =============================================================================

/// ClusterSync routes, relative to the API prefix
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/storageconfigs",
            post(create_storage).get(list_entries::<StorageConfig>),
        )
        .route(
            "/storageconfigs/:name",
            put(update_storage)
                .get(get_entry::<StorageConfig>)
                .delete(delete_entry::<StorageConfig>),
        )
        .route(
            "/backupconfigs",
            post(create_backup).get(list_entries::<BackupConfig>),
        )
        .route(
            "/backupconfigs/:name",
            put(update_backup)
                .get(get_entry::<BackupConfig>)
                .delete(delete_entry::<BackupConfig>),
        )
        .route(
            "/restoreconfigs",
            post(create_restore).get(list_entries::<RestoreConfig>),
        )
        .route(
            "/restoreconfigs/:name",
            put(update_restore)
                .get(get_entry::<RestoreConfig>)
                .delete(delete_entry::<RestoreConfig>),
        )
        .route(
            "/scheduleconfigs",
            post(create_schedule).get(list_entries::<ScheduleConfig>),
        )
        .route(
            "/scheduleconfigs/:name",
            put(update_schedule)
                .get(get_entry::<ScheduleConfig>)
                .delete(delete_entry::<ScheduleConfig>),
        )
}

// =============================================================================
// Error Mapping
// =============================================================================

impl Error {
    /// HTTP status for a failed ClusterSync request
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation {
                kind: ValidationKind::Semantic,
                ..
            } => StatusCode::BAD_REQUEST,
            Error::Validation {
                kind: ValidationKind::Length,
                ..
            } => StatusCode::FORBIDDEN,
            Error::EntryNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn decode<T>(body: JsonBody<T>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| Error::Decode(rejection.body_text()))
}

fn success<T: Serialize>(kind: &str, operation: &str, body: T) -> Response {
    metrics::API_REQUESTS
        .with_label_values(&[kind, operation, "200"])
        .inc();
    (StatusCode::OK, Json(body)).into_response()
}

fn failure(kind: &str, operation: &str, err: Error) -> Response {
    let status = err.status_code();
    failure_with_status(kind, operation, err, status)
}

fn failure_with_status(kind: &str, operation: &str, err: Error, status: StatusCode) -> Response {
    metrics::API_REQUESTS
        .with_label_values(&[kind, operation, status.as_str()])
        .inc();

    if status.is_server_error() {
        warn!("{} {} failed: {}", operation, kind, err);
    } else {
        debug!("{} {} rejected: {}", operation, kind, err);
    }

    match err {
        Error::Validation { reason, .. } => (status, Json(ReasonResponse { reason })).into_response(),
        other => (status, other.to_string()).into_response(),
    }
}

// =============================================================================
// Generic Operations
// =============================================================================

async fn create_entry<E: EntryResource>(state: &AppState, entry: Result<E>) -> Response {
    let result = match entry {
        Ok(entry) => state.store.create(entry).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(name) => success(E::KIND, "create", NameResponse::new(E::NAME_KEY, name)),
        Err(e) => failure(E::KIND, "create", e),
    }
}

async fn update_entry<E, F>(state: &AppState, name: &str, apply: Result<F>) -> Response
where
    E: EntryResource,
    F: Fn(&mut E) -> Result<()> + Send + Sync,
{
    let result = match apply {
        Ok(apply) => state.store.update(name, apply).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(entry) => success(E::KIND, "update", entry.to_response()),
        // A missing entry is only a 404 on lookup
        Err(e @ Error::EntryNotFound { .. }) => {
            failure_with_status(E::KIND, "update", e, StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => failure(E::KIND, "update", e),
    }
}

async fn get_entry<E: EntryResource>(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.store.get::<E>(&name).await {
        Ok(entry) => success(E::KIND, "get", entry.to_response()),
        Err(e) => failure(E::KIND, "get", e),
    }
}

async fn list_entries<E: EntryResource>(State(state): State<AppState>) -> Response {
    match state.store.list::<E>().await {
        Ok(entries) => {
            let items = entries.iter().map(E::to_response).collect();
            success(E::KIND, "list", ListResponse::new(items))
        }
        Err(e) => failure(E::KIND, "list", e),
    }
}

async fn delete_entry<E: EntryResource>(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.store.delete::<E>(&name).await {
        Ok(()) => {
            metrics::API_REQUESTS
                .with_label_values(&[E::KIND, "delete", "200"])
                .inc();
            StatusCode::OK.into_response()
        }
        Err(e) => failure(E::KIND, "delete", e),
    }
}

// =============================================================================
// Storage
// =============================================================================

async fn create_storage(
    State(state): State<AppState>,
    body: JsonBody<StorageRequest>,
) -> Response {
    let entry = decode(body).and_then(|req| {
        req.validate()?;
        Ok(req.into_config())
    });
    create_entry(&state, entry).await
}

async fn update_storage(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: JsonBody<StorageModifyRequest>,
) -> Response {
    let apply = decode(body).and_then(|patch| {
        patch.validate()?;
        Ok(move |entry: &mut StorageConfig| -> Result<()> {
            patch.apply_to(entry);
            Ok(())
        })
    });
    update_entry(&state, &name, apply).await
}

// =============================================================================
// Backup
// =============================================================================

async fn create_backup(State(state): State<AppState>, body: JsonBody<BackupRequest>) -> Response {
    let entry = decode(body).and_then(|req| {
        req.validate(true)?;
        req.into_config()
    });
    create_entry(&state, entry).await
}

async fn update_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: JsonBody<BackupModifyRequest>,
) -> Response {
    let apply = decode(body).and_then(|patch| {
        patch.validate()?;
        Ok(move |entry: &mut BackupConfig| patch.apply_to_config(entry))
    });
    update_entry(&state, &name, apply).await
}

// =============================================================================
// Restore
// =============================================================================

async fn create_restore(
    State(state): State<AppState>,
    body: JsonBody<RestoreRequest>,
) -> Response {
    let entry = decode(body).and_then(|req| {
        req.validate()?;
        Ok(req.into_config())
    });
    create_entry(&state, entry).await
}

async fn update_restore(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: JsonBody<RestoreModifyRequest>,
) -> Response {
    let apply = decode(body).and_then(|patch| {
        patch.validate()?;
        Ok(move |entry: &mut RestoreConfig| patch.apply_to(entry))
    });
    update_entry(&state, &name, apply).await
}

// =============================================================================
// Schedule
// =============================================================================

async fn create_schedule(
    State(state): State<AppState>,
    body: JsonBody<ScheduleRequest>,
) -> Response {
    let entry = decode(body).and_then(|req| {
        req.validate()?;
        req.into_config()
    });
    create_entry(&state, entry).await
}

async fn update_schedule(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: JsonBody<ScheduleModifyRequest>,
) -> Response {
    let apply = decode(body).and_then(|patch| {
        patch.validate()?;
        Ok(move |entry: &mut ScheduleConfig| patch.apply_to(entry))
    });
    update_entry(&state, &name, apply).await
}
