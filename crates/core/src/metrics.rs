//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Cache (lookups by result)
//! - Providers (failures by provider and operation)
//! - Aggregator (page fetch duration)
//! - Collector (request outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Cache
// =============================================================================

/// Cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streamdex_cache_lookups_total", "Total cache lookups"),
        &["result"], // "hit", "miss", "error"
    )
    .unwrap()
});

// =============================================================================
// Providers
// =============================================================================

/// Provider failures absorbed by the aggregator.
pub static PROVIDER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "streamdex_provider_failures_total",
            "Total failed provider calls",
        ),
        &["provider", "operation"],
    )
    .unwrap()
});

// =============================================================================
// Aggregator
// =============================================================================

/// Page fetch duration in seconds, cache hits included.
pub static PAGE_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "streamdex_page_fetch_duration_seconds",
            "Duration of one aggregated page fetch",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Records returned per page after filtering.
pub static PAGE_RECORDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "streamdex_page_records",
            "Number of records returned per page",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 15.0, 20.0, 50.0]),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Collector
// =============================================================================

/// Collector `request_next` calls by outcome.
pub static COLLECTOR_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "streamdex_collector_fetches_total",
            "Total collector page requests",
        ),
        &["outcome"], // "loaded", "empty", "skipped", "exhausted", "discarded"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(PROVIDER_FAILURES.clone()),
        Box::new(PAGE_FETCH_DURATION.clone()),
        Box::new(PAGE_RECORDS.clone()),
        Box::new(COLLECTOR_FETCHES.clone()),
    ]
}
