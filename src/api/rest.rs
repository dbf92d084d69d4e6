//! REST Router
//!
//! Assembles the ClusterSync endpoints, health probes and HTTP tracing
//! into one axum router.

use crate::clustersync::ClusterSyncStore;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use super::clustersync;

/// Prefix of the ClusterSync endpoints
pub const CLUSTERSYNC_API_PREFIX: &str = "/apis/clustersync.kubesphere.io/v1";

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    store: ClusterSyncStore,
    max_body_size: usize,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(store: ClusterSyncStore) -> Self {
        Self {
            store,
            max_body_size: 2 * 1024 * 1024,
        }
    }

    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState { store: self.store };

        Router::new()
            .nest(CLUSTERSYNC_API_PREFIX, clustersync::routes())
            // Health endpoints
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .layer(DefaultBodyLimit::max(self.max_body_size))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: ClusterSyncStore,
}

// =============================================================================
// Health
// =============================================================================

/// Liveness check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.store.is_reachable().await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "OperatorConfig store unreachable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustersync::{InMemoryOperatorConfigRepository, StoreConfig};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let repo = Arc::new(InMemoryOperatorConfigRepository::new());
        RestRouter::new(ClusterSyncStore::new(repo, StoreConfig::default())).build()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        for path in ["/health", "/ready"] {
            let request = Request::builder().uri(path).body(Body::empty()).unwrap();
            let response = router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::builder()
            .uri("/apis/clustersync.kubesphere.io/v1/widgets")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
