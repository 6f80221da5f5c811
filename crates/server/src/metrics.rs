//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the mrcontent server:
//! - HTTP request metrics (latency, counts, auth failures)
//! - Content lifecycle counters
//! - Records by status (collected dynamically)
//!
//! Processing metrics from the core crate are registered alongside.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use mrcontent_core::ContentFilter;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mrcontent_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mrcontent_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mrcontent_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mrcontent_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Content Metrics
// =============================================================================

/// Active content records by status.
pub static CONTENT_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mrcontent_content_by_status", "Active content records by status"),
        &["status"],
    )
    .unwrap()
});

/// Content records created.
pub static CONTENT_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mrcontent_content_created_total",
        "Total content records created",
    )
    .unwrap()
});

/// Content records soft-deleted.
pub static CONTENT_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mrcontent_content_deleted_total",
        "Total content records deleted",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Content
    registry
        .register(Box::new(CONTENT_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(CONTENT_CREATED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(CONTENT_DELETED_TOTAL.clone()))
        .unwrap();

    // Core metrics (dispatch, ingestion, tracking)
    for metric in mrcontent_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the status gauges reflect the store.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let store = state.store();
    for status in ["draft", "processing", "processed"] {
        let filter = ContentFilter::new().with_status(status);
        if let Ok(count) = store.count(&filter).await {
            CONTENT_BY_STATUS.with_label_values(&[status]).set(count);
        }
    }
}

static UUID_SEGMENT: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});
static SIMPLE_ID_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/[0-9a-fA-F]{32}(/|$)").unwrap());
static REF_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/ref/[^/]+").unwrap());
static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "{id}");
    let result = SIMPLE_ID_SEGMENT.replace_all(&result, "/{id}$1");
    let result = REF_SEGMENT.replace_all(&result, "/ref/{ref_id}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/mr-content/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/mr-content/{id}");
    }

    #[test]
    fn test_normalize_path_simple_id() {
        let path = "/api/v1/mr-content/550e8400e29b41d4a716446655440000/processing";
        assert_eq!(normalize_path(path), "/api/v1/mr-content/{id}/processing");
    }

    #[test]
    fn test_normalize_path_ref_id() {
        let path = "/api/v1/mr-content/ref/aB3-x_";
        assert_eq!(normalize_path(path), "/api/v1/mr-content/ref/{ref_id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/mr-content/12345";
        assert_eq!(normalize_path(path), "/api/v1/mr-content/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/media/callback"), "/api/media/callback");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("mrcontent_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Prometheus only outputs metrics that have been touched
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        CONTENT_BY_STATUS.with_label_values(&["draft"]).set(0);
        CONTENT_CREATED_TOTAL.inc();
        mrcontent_core::metrics::TRACKED_CONTENT.set(0);

        let output = encode_metrics();

        assert!(output.contains("mrcontent_http_request_duration_seconds"));
        assert!(output.contains("mrcontent_http_requests_total"));
        assert!(output.contains("mrcontent_http_requests_in_flight"));
        assert!(output.contains("mrcontent_content_by_status"));
        assert!(output.contains("mrcontent_content_created_total"));
        assert!(output.contains("mrcontent_tracked_content"));
    }
}
