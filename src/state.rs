use shared::{CacheBackend, Config};
use std::sync::Arc;
use tracing::info;

use crate::cache::ResponseCache;
use crate::store::{KeyValueStore, MemoryStore, RedisStore};

/// Shared application state.
/// Holds the configuration and the response cache over the configured store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: ResponseCache,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.cache.backend {
            CacheBackend::Redis => {
                let store = RedisStore::from_config(&config.redis)?
                    .with_scan_batch_size(config.cache.scan_batch_size);
                // Unreachable Redis is not fatal; the cache fails open
                if let Err(e) = store.ping().await {
                    tracing::warn!("⚠️ Redis not reachable at startup: {}", e);
                }
                Arc::new(store)
            }
            CacheBackend::Memory => {
                let store = MemoryStore::new();
                store.start_background_cleanup();
                info!("🧠 Using in-process cache store");
                Arc::new(store)
            }
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let cache = ResponseCache::new(store, &config.cache);
        Self {
            config: Arc::new(config),
            cache,
        }
    }
}
