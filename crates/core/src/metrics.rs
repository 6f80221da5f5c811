//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Dispatch (processing requests published per topic)
//! - Ingestion (results received per transport and outcome)
//! - Tracking (status transitions, records with outstanding tasks)

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Dispatch
// =============================================================================

/// Processing requests published by topic and result.
pub static REQUESTS_PUBLISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mrcontent_processing_requests_total",
            "Processing requests published to the bus",
        ),
        &["topic", "result"], // result: "ok", "error"
    )
    .unwrap()
});

/// Completions registered to make up for requests that were never published.
pub static COMPENSATED_COMPLETIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mrcontent_compensated_completions_total",
        "Completions registered for failed publishes",
    )
    .unwrap()
});

// =============================================================================
// Ingestion
// =============================================================================

/// Processing results received by transport and outcome.
pub static RESULTS_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mrcontent_processing_results_total",
            "Processing results received",
        ),
        // transport: "callback", "bus"
        // outcome: "applied", "failed_task", "duplicate", "rejected", "error"
        &["transport", "outcome"],
    )
    .unwrap()
});

// =============================================================================
// Tracking
// =============================================================================

/// Status transitions performed by the tracker.
pub static STATUS_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mrcontent_status_transitions_total",
            "Content status transitions driven by processing",
        ),
        &["to"],
    )
    .unwrap()
});

/// Content records with outstanding processing tasks.
pub static TRACKED_CONTENT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mrcontent_tracked_content",
        "Content records with outstanding processing tasks",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(REQUESTS_PUBLISHED.clone()),
        Box::new(COMPENSATED_COMPLETIONS.clone()),
        Box::new(RESULTS_RECEIVED.clone()),
        Box::new(STATUS_TRANSITIONS.clone()),
        Box::new(TRACKED_CONTENT.clone()),
    ]
}
