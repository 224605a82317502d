//! Request metrics.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder, returning the render handle.
pub fn install_recorder() -> Option<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().ok()
}

/// Record request counters and latency per method/path/status.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "tscout_http_requests_total",
        "method" => method.to_string(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "tscout_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}

/// Collapse ids so the label set stays bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            // UUID-ish or otherwise high-cardinality segments.
            if segment.len() >= 16 && segment.chars().any(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
