//! Prometheus metrics for the API server.
//!
//! Pipeline metrics (`playcoach_videos_total` and friends) are recorded by
//! the worker crate and exported through the same recorder.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "playcoach_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "playcoach_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "playcoach_http_requests_in_flight";
    pub const UPLOADS_TOTAL: &str = "playcoach_uploads_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an accepted or rejected upload.
pub fn record_upload(result: &str) {
    counter!(names::UPLOADS_TOTAL, "result" => result.to_string()).increment(1);
}

/// Collapse per-file paths so filenames don't become label values.
fn sanitize_path(path: &str) -> String {
    for prefix in ["/video/", "/analysis/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            if !rest.is_empty() {
                return format!("{}:filename", prefix);
            }
        }
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
