// ============================================================================
// KEY-VALUE STORE - Backends for the response cache
// ============================================================================
// The cache layer only needs get / set-with-ttl / delete / list-by-pattern.
// Anything that offers those four primitives can sit behind ResponseCache.
// ============================================================================

pub mod memory;
pub mod redis_store;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::time::Duration;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Invalid key pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Create or overwrite `key`, restarting its expiration clock
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove `keys`; absent keys are ignored. Returns how many were removed.
    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Every live key matching a Redis-style glob `pattern`
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}
