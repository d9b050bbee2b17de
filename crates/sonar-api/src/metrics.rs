//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "sonar_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "sonar_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "sonar_http_requests_in_flight";

    // Analysis metrics
    pub const AUDIO_REQUESTS_TOTAL: &str = "audio_requests_total";
    pub const AUDIO_PROCESSING_DURATION_SECONDS: &str = "audio_processing_duration_seconds";
    pub const AUDIO_ERRORS_TOTAL: &str = "audio_errors_total";
    pub const AUDIO_CACHE_LOOKUPS_TOTAL: &str = "audio_cache_lookups_total";
}

/// Routes reported by name; everything else is grouped as "other".
const KNOWN_PATHS: [&str; 4] = ["/v1/audio/analyze", "/health", "/ready", "/metrics"];

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", normalize_path(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an accepted analysis request.
pub fn record_analysis_request() {
    counter!(names::AUDIO_REQUESTS_TOTAL).increment(1);
}

/// Record time spent in one analysis call.
pub fn record_processing_duration(duration_secs: f64) {
    histogram!(names::AUDIO_PROCESSING_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed analysis by error kind.
pub fn record_analysis_error(error_type: &str) {
    let labels = [("error_type", error_type.to_string())];
    counter!(names::AUDIO_ERRORS_TOTAL, &labels).increment(1);
}

/// Record a cache lookup outcome.
pub fn record_cache_lookup(result: &str) {
    let labels = [("result", result.to_string())];
    counter!(names::AUDIO_CACHE_LOOKUPS_TOTAL, &labels).increment(1);
}

/// Keep the path label bounded.
fn normalize_path(path: &str) -> &str {
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    KNOWN_PATHS
        .iter()
        .find(|known| **known == trimmed)
        .copied()
        .unwrap_or("other")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
