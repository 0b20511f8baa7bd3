//! Prometheus metrics for feed-service
//!
//! HTTP request metrics live here; fan-out pipeline metrics in [`fanout`].
//! Everything registers with the default registry and is exported at `/metrics`.

pub mod fanout;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Duration;

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_service_http_requests_total",
        "HTTP requests handled, by route and status",
        &["method", "route", "status"]
    )
    .expect("Failed to register HTTP requests metric")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_service_http_request_duration_seconds",
        "HTTP request latency, by route",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register HTTP duration metric")
});

/// Record one handled request. `route` should be the matched pattern so
/// that path parameters do not explode label cardinality.
pub fn observe_http_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, route, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, route])
        .observe(elapsed.as_secs_f64());
}

/// `GET /metrics` in the Prometheus text format
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&prometheus::gather(), &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}
