//! Background Job Metrics
//!
//! Prometheus metrics for fan-out and trending generation

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::time::Duration;

static FANOUT_CHUNKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fanout_chunks_total",
        "Feed entry batches written by fan-out (success/error)",
        &["status"]
    )
    .expect("Failed to register fanout chunks metric")
});

static FANOUT_JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fanout_jobs_total",
        "Fan-out jobs by outcome (queued/dropped/completed/follower_lookup_failed)",
        &["status"]
    )
    .expect("Failed to register fanout jobs metric")
});

static TRENDING_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trending_runs_total",
        "Trending generation runs (success/error/skipped)",
        &["status"]
    )
    .expect("Failed to register trending runs metric")
});

static TRENDING_RUN_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "trending_run_duration_seconds",
        "Duration of trending generation runs",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]
    )
    .expect("Failed to register trending run duration metric")
});

static TRENDING_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "trending_items",
        "Number of items persisted by the last successful trending run"
    )
    .expect("Failed to register trending items metric")
});

pub fn record_fanout_chunk(status: &str) {
    FANOUT_CHUNKS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_fanout_job(status: &str) {
    FANOUT_JOBS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_trending_run(status: &str) {
    TRENDING_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_trending_duration(duration: Duration) {
    TRENDING_RUN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn set_trending_items(count: usize) {
    TRENDING_ITEMS.set(count as i64);
}
