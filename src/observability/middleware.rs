// ============================================================================
// HTTP METRICS MIDDLEWARE
// ============================================================================

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::record_http_request;

/// Records count and latency of every HTTP request
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let normalized_path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    record_http_request(&method, &normalized_path, response.status().as_u16(), duration);

    response
}

/// Collapse id-like segments so label cardinality stays bounded
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            let is_object_id = seg.len() == 24 && seg.chars().all(|c| c.is_ascii_hexdigit());
            if is_object_id || (!seg.is_empty() && seg.parse::<i64>().is_ok()) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
