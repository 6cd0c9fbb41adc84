//! Feed Assembly Metrics
//!
//! Prometheus metrics for the feed read path

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::time::Duration;

static FEED_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_requests_total",
        "Feed page requests by outcome (success/error/timeout)",
        &["outcome"]
    )
    .expect("Failed to register feed requests metric")
});

static FEED_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_request_duration_seconds",
        "Feed page assembly latency",
        &["outcome"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register feed request duration metric")
});

static FEED_BACKFILL_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_backfill_total",
        "Trending backfill attempts for sparse follow feeds (used/failed)",
        &["status"]
    )
    .expect("Failed to register feed backfill metric")
});

static FEED_HYDRATION_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "feed_hydration_misses_total",
        "Feed entries dropped because the referenced post no longer exists"
    )
    .expect("Failed to register hydration misses metric")
});

static FEED_DEGRADED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_degraded_total",
        "Enrichment steps that fell back to defaults",
        &["step"]
    )
    .expect("Failed to register feed degraded metric")
});

/// Record a finished feed request
pub fn record_feed_request(outcome: &str, duration: Duration) {
    FEED_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    FEED_REQUEST_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

pub fn record_backfill(status: &str) {
    FEED_BACKFILL_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_hydration_misses(count: usize) {
    FEED_HYDRATION_MISSES_TOTAL.inc_by(count as u64);
}

/// Record an enrichment step (like_status/author_name/backfill) that degraded
pub fn record_degraded(step: &str) {
    FEED_DEGRADED_TOTAL.with_label_values(&[step]).inc();
}
