// ============================================================================
// PROMETHEUS METRICS
// ============================================================================
// Counters for the response cache and the HTTP surface, scraped via /metrics
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    // ========================================================================
    // HTTP REQUEST METRICS
    // ========================================================================

    /// HTTP requests by method, endpoint and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========================================================================
    // RESPONSE CACHE METRICS
    // ========================================================================

    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_hits_total",
        "Total number of response cache hits",
        &["backend", "resource"]
    )
    .unwrap();

    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_misses_total",
        "Total number of response cache misses",
        &["backend", "resource"]
    )
    .unwrap();

    /// Store failures absorbed by the cache (timeouts included)
    pub static ref CACHE_STORE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_store_errors_total",
        "Total number of key-value store failures absorbed by the cache",
        &["backend", "operation"]
    )
    .unwrap();

    pub static ref CACHE_INVALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_invalidations_total",
        "Total number of cache entries removed by invalidation",
        &["backend", "kind"]
    )
    .unwrap();

    // ========================================================================
    // VIEW COUNTING
    // ========================================================================

    pub static ref VIDEO_VIEWS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "video_views_recorded_total",
        "View requests by dedup outcome",
        &["outcome"]
    )
    .unwrap();
}

/// Record an HTTP request
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);
}

/// Record a cache hit/miss
pub fn record_cache_access(backend: &str, resource: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL
            .with_label_values(&[backend, resource])
            .inc();
    } else {
        CACHE_MISSES_TOTAL
            .with_label_values(&[backend, resource])
            .inc();
    }
}

pub fn record_store_error(backend: &str, operation: &str) {
    CACHE_STORE_ERRORS_TOTAL
        .with_label_values(&[backend, operation])
        .inc();
}

pub fn record_invalidation(backend: &str, kind: &str, removed: u64) {
    CACHE_INVALIDATIONS_TOTAL
        .with_label_values(&[backend, kind])
        .inc_by(removed);
}

pub fn record_view(added: bool) {
    let outcome = if added { "added" } else { "duplicate" };
    VIDEO_VIEWS_RECORDED_TOTAL
        .with_label_values(&[outcome])
        .inc();
}
