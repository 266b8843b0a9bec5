use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::CacheStats;
use crate::monitoring::uptime_seconds;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache_store: StoreHealth,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub status: String,
    pub backend: String,
    pub last_ping_duration_ms: Option<u64>,
    pub error: Option<String>,
}

/// Create monitoring router with metrics and health endpoints
pub fn monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .route("/metrics/cache", get(cache_metrics))
}

/// Basic liveness check for load balancers
async fn health_check() -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": env!("CARGO_PKG_NAME")
    });

    (StatusCode::OK, Json(health))
}

/// Health including a round-trip to the cache store
async fn detailed_health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start_time = std::time::Instant::now();

    let cache_store = match state.cache.health_check().await {
        Ok(latency) => StoreHealth {
            status: "healthy".to_string(),
            backend: state.cache.backend().to_string(),
            last_ping_duration_ms: Some(latency.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            error!("Cache store health check failed: {}", e);
            StoreHealth {
                status: "unhealthy".to_string(),
                backend: state.cache.backend().to_string(),
                last_ping_duration_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    let overall_status = if cache_store.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    let health = HealthCheck {
        status: overall_status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
        cache_store,
    };

    let status_code = if overall_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    info!(
        overall_status = %overall_status,
        check_duration_ms = %start_time.elapsed().as_millis(),
        "Health check completed"
    );

    (status_code, Json(health))
}

async fn prometheus_metrics() -> impl IntoResponse {
    crate::observability::metrics_handler().await
}

/// Hit/miss counters of this instance's response cache
async fn cache_metrics(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FailingStore;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use shared::{AppConfig, CacheConfig, Config, RedisConfig};
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
                pool_size: 1,
                connection_timeout_seconds: 1,
            },
            cache: CacheConfig::default(),
            app: AppConfig {
                environment: "test".to_string(),
                log_level: "debug".to_string(),
                port: 0,
            },
        }
    }

    async fn status_of(state: AppState, uri: &str) -> StatusCode {
        let app = monitoring_router().with_state(Arc::new(state));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_detailed_health_ok_with_memory_store() {
        let state = AppState::with_store(test_config(), Arc::new(MemoryStore::new()));
        assert_eq!(status_of(state, "/health/detailed").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_detailed_health_degraded_when_store_down() {
        let state = AppState::with_store(test_config(), Arc::new(FailingStore));
        assert_eq!(
            status_of(state, "/health/detailed").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_liveness_ignores_store() {
        let state = AppState::with_store(test_config(), Arc::new(FailingStore));
        assert_eq!(status_of(state, "/health").await, StatusCode::OK);
    }
}
