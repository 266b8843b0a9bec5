use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod cache_key;
pub mod cache_ttl;
pub mod invalidation;
pub mod monitoring;
pub mod observability;
pub mod state;
pub mod store;
pub mod views;

pub use cache::{CacheError, CacheStats, ResponseCache};
pub use cache_key::{CacheKey, CacheResource, KeyGenerator};
pub use invalidation::{CacheEvent, Invalidation, InvalidationScope};
pub use store::{KeyValueStore, MemoryStore, RedisStore, StoreError};
pub use views::{ViewCounter, ViewOutcome, ViewTracker};

use monitoring::endpoints::monitoring_router;
use observability::metrics_middleware;
use state::AppState;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Operational endpoints, including Prometheus /metrics
        .merge(monitoring_router())
        .with_state(app_state)
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
