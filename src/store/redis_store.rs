// ============================================================================
// REDIS STORE
// ============================================================================
// Pooled Redis connections (deadpool-redis) behind the KeyValueStore trait.
// ============================================================================

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{KeyValueStore, StoreError};
use shared::config::RedisConfig;

const DEFAULT_SCAN_BATCH: usize = 500;

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    scan_batch_size: usize,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            scan_batch_size: DEFAULT_SCAN_BATCH,
        }
    }

    pub fn with_scan_batch_size(mut self, scan_batch_size: usize) -> Self {
        self.scan_batch_size = scan_batch_size.max(1);
        self
    }

    /// Build a pool from configuration. No connection is opened until first use.
    pub fn from_config(config: &RedisConfig) -> anyhow::Result<Self> {
        info!("🔧 Creating Redis pool for {} (max {} connections)", config.url, config.pool_size);

        let mut cfg = deadpool_redis::Config::from_url(&config.url);
        let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size.max(1));
        pool_config.timeouts.wait = Some(Duration::from_secs(config.connection_timeout_seconds));
        pool_config.timeouts.create = Some(Duration::from_secs(config.connection_timeout_seconds));
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| anyhow::anyhow!("Failed to create Redis pool: {}", e))?;

        Ok(Self::new(pool))
    }

    /// Get a Redis connection from the pool
    async fn get_connection(&self) -> Result<Connection, StoreError> {
        self.pool.get().await.map_err(|e| {
            error!("Failed to get Redis connection: {}", e);
            StoreError::from(e)
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        // SETEX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_connection().await?;
        let deleted: u64 = conn.del(keys.to_vec()).await?;
        Ok(deleted)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.get_connection().await?;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        // Incremental SCAN keeps the server responsive, unlike KEYS
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_batch_size)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may report a key more than once
        keys.sort();
        keys.dedup();

        debug!(pattern = %pattern, matched = keys.len(), "🔍 Redis pattern scan");
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
