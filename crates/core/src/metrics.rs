//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scan sessions (outcomes, processed items, duration)
//! - Reconciliation (media and request transitions)
//! - Availability aggregation (cache usage)
//! - Routing (resolutions by outcome)
//! - External services (Radarr, Sonarr, Readarr, Jellyfin)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Scan Metrics
// =============================================================================

/// Scan sessions finished, by service and outcome.
pub static SCAN_SESSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("requestarr_scan_sessions_total", "Total scan sessions"),
        &["service", "outcome"], // "finished", "cancelled", "superseded"
    )
    .unwrap()
});

/// Inventory items handled by scan sessions.
pub static SCAN_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "requestarr_scan_items_total",
            "Inventory items processed by scan sessions",
        ),
        &["service", "result"], // "applied", "unchanged", "skipped", "error"
    )
    .unwrap()
});

/// Scan session duration in seconds.
pub static SCAN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "requestarr_scan_duration_seconds",
            "Duration of scan sessions",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
        &["service"],
    )
    .unwrap()
});

// =============================================================================
// Reconciliation Metrics
// =============================================================================

/// Status transitions performed by the reconciliation engine.
pub static RECONCILE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "requestarr_reconcile_transitions_total",
            "Status transitions performed during reconciliation",
        ),
        &["kind", "to_status"], // kind: "media", "request", "season_request"
    )
    .unwrap()
});

// =============================================================================
// Availability Metrics
// =============================================================================

/// Availability cache lookups by result.
pub static AVAILABILITY_CACHE: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "requestarr_availability_cache_total",
            "Availability cache lookups",
        ),
        &["kind", "result"], // kind: "movie", "show"; result: "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// Routing Metrics
// =============================================================================

/// Route resolutions by resolver and outcome.
pub static ROUTING_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "requestarr_routing_resolutions_total",
            "Route resolutions performed",
        ),
        &["resolver", "outcome"], // outcome: "rule", "default", "error"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service call duration in seconds.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "requestarr_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "requestarr_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Scans
        Box::new(SCAN_SESSIONS.clone()),
        Box::new(SCAN_ITEMS.clone()),
        Box::new(SCAN_DURATION.clone()),
        // Reconciliation
        Box::new(RECONCILE_TRANSITIONS.clone()),
        // Availability
        Box::new(AVAILABILITY_CACHE.clone()),
        // Routing
        Box::new(ROUTING_RESOLUTIONS.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
