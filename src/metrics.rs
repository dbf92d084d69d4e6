//! Prometheus metrics
//!
//! Registered in the default registry on first use and exported by the
//! metrics server in `main.rs`.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

/// REST requests by entity, operation and response status
pub static API_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clustersync_api_requests_total",
        "ClusterSync REST requests",
        &["entity", "operation", "status"]
    )
    .expect("metric can be registered")
});

/// Optimistic-concurrency retries on the OperatorConfig singleton
pub static CONFLICT_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clustersync_operatorconfig_conflict_retries_total",
        "Writes to the OperatorConfig retried after a conflict"
    )
    .expect("metric can be registered")
});

/// DiskVolume reconciles by outcome
pub static RECONCILES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clustersync_diskvolume_reconciles_total",
        "DiskVolume reconcile passes",
        &["outcome"]
    )
    .expect("metric can be registered")
});

pub static RECONCILE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "clustersync_diskvolume_reconcile_duration_seconds",
        "Duration of DiskVolume reconcile passes",
        &["outcome"]
    )
    .expect("metric can be registered")
});

/// Force registration so the series show up before the first event
pub fn register() {
    Lazy::force(&API_REQUESTS);
    Lazy::force(&CONFLICT_RETRIES);
    Lazy::force(&RECONCILES);
    Lazy::force(&RECONCILE_DURATION);
}

/// Render the default registry in the text exposition format
pub fn render() -> Vec<u8> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_series() {
        register();
        CONFLICT_RETRIES.inc();
        API_REQUESTS.with_label_values(&["storage", "create", "200"]).inc();

        let text = String::from_utf8(render()).unwrap();
        assert!(text.contains("clustersync_operatorconfig_conflict_retries_total"));
        assert!(text.contains("clustersync_api_requests_total"));
    }
}
