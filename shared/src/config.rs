//! Configuration management for the video platform backend

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl std::str::FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(anyhow::anyhow!("unknown CACHE_BACKEND: {}", other)),
        }
    }
}

/// Response cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Prefix shared by every response-cache key
    pub namespace: String,
    pub default_ttl_seconds: u64,
    pub view_marker_ttl_seconds: u64,
    /// Upper bound for a single store round-trip before it counts as a failure
    pub operation_timeout_ms: u64,
    pub scan_batch_size: usize,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn view_marker_ttl(&self) -> Duration {
        Duration::from_secs(self.view_marker_ttl_seconds)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            namespace: "app".to_string(),
            default_ttl_seconds: 3600,    // 1 hour
            view_marker_ttl_seconds: 86400, // 24 hours
            operation_timeout_ms: 250,
            scan_batch_size: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let cache_defaults = CacheConfig::default();

        Ok(Config {
            redis: RedisConfig {
                url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
                pool_size: env::var("REDIS_POOL_SIZE")
                    .unwrap_or_else(|_| "16".to_string())
                    .parse()?,
                connection_timeout_seconds: env::var("REDIS_CONNECTION_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
            },
            cache: CacheConfig {
                backend: env::var("CACHE_BACKEND")
                    .unwrap_or_else(|_| "redis".to_string())
                    .parse()?,
                namespace: env::var("CACHE_NAMESPACE").unwrap_or(cache_defaults.namespace),
                default_ttl_seconds: env::var("CACHE_DEFAULT_TTL_SECONDS")
                    .unwrap_or_else(|_| cache_defaults.default_ttl_seconds.to_string())
                    .parse()?,
                view_marker_ttl_seconds: env::var("CACHE_VIEW_MARKER_TTL_SECONDS")
                    .unwrap_or_else(|_| cache_defaults.view_marker_ttl_seconds.to_string())
                    .parse()?,
                operation_timeout_ms: env::var("CACHE_OPERATION_TIMEOUT_MS")
                    .unwrap_or_else(|_| cache_defaults.operation_timeout_ms.to_string())
                    .parse()?,
                scan_batch_size: env::var("CACHE_SCAN_BATCH_SIZE")
                    .unwrap_or_else(|_| cache_defaults.scan_batch_size.to_string())
                    .parse()?,
            },
            app: AppConfig {
                environment: env::var("ENVIRONMENT")
                    .unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "info".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_defaults_match_documented_values() {
        let cache = CacheConfig::default();
        assert_eq!(cache.namespace, "app");
        assert_eq!(cache.default_ttl(), Duration::from_secs(3600));
        assert_eq!(cache.view_marker_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(cache.operation_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!(" Memory ".parse::<CacheBackend>().unwrap(), CacheBackend::Memory);
        assert!("memcached".parse::<CacheBackend>().is_err());
    }
}
