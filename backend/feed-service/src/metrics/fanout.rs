//! Fan-out Metrics
//!
//! Prometheus metrics for the feed fan-out pipeline. Together with the
//! tracing output these are the only place fan-out failures surface.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::time::Duration;

static FANOUT_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_fanout_runs_total",
        "Total fan-out runs (success/degraded/failed)",
        &["status"]
    )
    .expect("Failed to register fan-out runs metric")
});

static RESOLVER_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_fanout_resolver_failures_total",
        "Recipient lookups that degraded to an empty result",
        &["resolver", "cause"]
    )
    .expect("Failed to register fan-out resolver failures metric")
});

static ENTRIES_WRITTEN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "feed_fanout_entries_written_total",
        "Feed entries persisted by fan-out"
    )
    .expect("Failed to register fan-out entries written metric")
});

static STAGE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_fanout_duration_seconds",
        "Duration of fan-out stages",
        &["stage"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .expect("Failed to register fan-out duration metric")
});

static QUEUE_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "feed_fanout_queue_dropped_total",
        "Fan-out jobs dropped because the queue was full or closed"
    )
    .expect("Failed to register fan-out queue dropped metric")
});

/// Record fan-out run result (success/degraded/failed)
pub fn record_run(status: &str) {
    FANOUT_RUNS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a resolver lookup that was replaced by an empty result
pub fn record_resolver_failure(resolver: &str, cause: &str) {
    RESOLVER_FAILURES_TOTAL
        .with_label_values(&[resolver, cause])
        .inc();
}

pub fn record_entries_written(count: u64) {
    ENTRIES_WRITTEN_TOTAL.inc_by(count);
}

/// Record how long a pipeline stage took
pub fn record_stage_duration(stage: &str, duration: Duration) {
    STAGE_DURATION_SECONDS
        .with_label_values(&[stage])
        .observe(duration.as_secs_f64());
}

pub fn record_queue_dropped() {
    QUEUE_DROPPED_TOTAL.inc();
}
