//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Reseed runs (results, duration, candidates)
//! - Per-torrent reseed outcomes and reseeded volume
//! - Statistics persistence

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Run Metrics
// =============================================================================

/// Runs total by result.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reseedjump_runs_total", "Total reseed runs"),
        &["result"], // "completed", "refused", "skipped"
    )
    .unwrap()
});

/// Run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "reseedjump_run_duration_seconds",
            "Duration of a full reseed run",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &[],
    )
    .unwrap()
});

/// Candidates selected per client.
pub static CANDIDATES_SELECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reseedjump_candidates_selected_total",
            "Torrents selected for reseeding",
        ),
        &["client"],
    )
    .unwrap()
});

// =============================================================================
// Torrent Metrics
// =============================================================================

/// Torrents processed by result.
pub static TORRENTS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reseedjump_torrents_processed_total",
            "Torrents processed by result",
        ),
        &["client", "result"], // "success", "export_failed", "delete_failed", "readd_failed"
    )
    .unwrap()
});

/// Bytes of reseeded content.
pub static RESEEDED_BYTES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reseedjump_reseeded_bytes_total",
            "Total size of successfully reseeded torrents",
        ),
        &["client"],
    )
    .unwrap()
});

// =============================================================================
// Statistics Metrics
// =============================================================================

/// Statistics document persistence failures.
pub static STATS_PERSIST_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reseedjump_stats_persist_failures_total",
        "Failures to load or save the statistics document",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(CANDIDATES_SELECTED.clone()),
        // Torrents
        Box::new(TORRENTS_PROCESSED.clone()),
        Box::new(RESEEDED_BYTES.clone()),
        // Statistics
        Box::new(STATS_PERSIST_FAILURES.clone()),
    ]
}
