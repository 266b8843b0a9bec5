//! Response cache in front of expensive read queries.
//!
//! Every call against the key-value store is bounded by a timeout. Reads fail
//! open (a broken or slow store is a miss), writes and invalidations fail
//! silently (logged, counted, swallowed). The only error a caller can see is an
//! unusable resource tag, since that is a defect at the call site.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::cache_key::{CacheKey, CacheResource, KeyGenerator};
use crate::cache_ttl;
use crate::invalidation::{CacheEvent, Invalidation, InvalidationScope};
use crate::observability;
use crate::store::{KeyValueStore, StoreError};
use shared::{AppError, CacheConfig};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid cache resource {resource:?}: {reason}")]
    InvalidResource {
        resource: String,
        reason: &'static str,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidResource { .. } => AppError::internal(err.to_string()),
            CacheError::Store(e) => AppError::service_unavailable(format!("cache store: {}", e)),
            CacheError::Timeout { operation, .. } => AppError::timeout(format!("cache {}", operation)),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub store_errors: u64,
    pub invalidated: u64,
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    store_errors: AtomicU64,
    invalidated: AtomicU64,
}

/// Handle to the response cache. Cheap to clone; clones share the store and counters.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
    keys: KeyGenerator,
    default_ttl: Duration,
    view_marker_ttl: Duration,
    op_timeout: Duration,
    counters: Arc<CacheCounters>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        info!(
            backend = store.backend(),
            namespace = %config.namespace,
            default_ttl = config.default_ttl_seconds,
            timeout_ms = config.operation_timeout_ms,
            "🎯 Initializing response cache"
        );
        Self {
            store,
            keys: KeyGenerator::new(config.namespace.clone()),
            default_ttl: config.default_ttl(),
            view_marker_ttl: config.view_marker_ttl(),
            op_timeout: config.operation_timeout(),
            counters: Arc::new(CacheCounters::default()),
        }
    }

    pub fn keys(&self) -> &KeyGenerator {
        &self.keys
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn view_marker_ttl(&self) -> Duration {
        self.view_marker_ttl
    }

    /// TTL for `resource`, honoring `TTL_<RESOURCE>_SECONDS` overrides
    pub fn ttl_for(&self, resource: CacheResource) -> Duration {
        cache_ttl::ttl_for(resource, self.default_ttl)
    }

    pub fn key(&self, resource: impl AsRef<str>, params: &[Value]) -> Result<CacheKey, CacheError> {
        self.keys.generate(resource, params)
    }

    /// Explicit `ttl`, else the per-resource TTL of the key, else the default
    fn resolve_ttl(&self, key: &CacheKey, ttl: Option<Duration>) -> Duration {
        ttl.unwrap_or_else(|| {
            CacheResource::from_tag(key.resource())
                .map(|resource| self.ttl_for(resource))
                .unwrap_or(self.default_ttl)
        })
    }

    /// Look up `key`. Misses, store failures, timeouts and unreadable entries all yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = match self.guarded("get", self.store.get(key.as_str())).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "Cache MISS");
                self.record_access(key, false);
                return None;
            }
            Err(e) => {
                self.absorb("get", key.as_str(), &e);
                self.record_access(key, false);
                return None;
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                debug!(key = %key, "🎯 Cache HIT");
                self.record_access(key, true);
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "🗑️ Dropping unreadable cache entry");
                self.remove_keys("corrupt", &[key.as_str().to_string()]).await;
                self.record_access(key, false);
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl` (the resource's TTL when `None`).
    ///
    /// Completes before returning; a failed write is logged and ignored.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) {
        let ttl = self.resolve_ttl(key, ttl);
        if ttl.is_zero() {
            debug!(key = %key, "Skipping cache write with zero TTL");
            return;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize response for cache");
                return;
            }
        };

        match self.guarded("set", self.store.set_ex(key.as_str(), &payload, ttl)).await {
            Ok(()) => debug!(key = %key, ttl = ttl.as_secs(), "🔑 Cached response"),
            Err(e) => self.absorb("set", key.as_str(), &e),
        }
    }

    /// Write `value` from a detached, named background task.
    ///
    /// The value is serialized before spawning, so later mutation by the caller
    /// cannot leak into the cache.
    pub fn spawn_set<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T, ttl: Option<Duration>) -> JoinHandle<()> {
        let payload = serde_json::to_value(value);
        let cache = self.clone();
        let span = tracing::info_span!("cache_write_behind", key = %key);

        tokio::spawn(
            async move {
                match payload {
                    Ok(value) => cache.set(&key, &value, ttl).await,
                    Err(e) => warn!(error = %e, "Failed to serialize response for cache"),
                }
            }
            .instrument(span),
        )
    }

    /// Read-through: serve `key` from cache, otherwise run `compute` and cache its result.
    ///
    /// Errors from `compute` are returned unchanged and nothing is cached.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &CacheKey, ttl: Option<Duration>, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let fresh = compute().await?;
        self.set(key, &fresh, ttl).await;
        Ok(fresh)
    }

    /// Remove one entry. Returns how many entries were actually removed.
    pub async fn invalidate(&self, key: &CacheKey) -> u64 {
        self.invalidate_many(std::slice::from_ref(key)).await
    }

    pub async fn invalidate_many(&self, keys: &[CacheKey]) -> u64 {
        let raw: Vec<String> = keys.iter().map(|k| k.as_str().to_string()).collect();
        self.remove_keys("key", &raw).await
    }

    /// Remove every entry of `resource` whose leading params equal `params`.
    ///
    /// Coarse by nature: with no params the whole resource is flushed.
    pub async fn invalidate_related(&self, resource: impl AsRef<str>, params: &[Value]) -> Result<u64, CacheError> {
        let resource = resource.as_ref();
        let patterns = self.keys.related_patterns(resource, params)?;

        let mut matched = Vec::new();
        for pattern in &patterns {
            match self.guarded("scan", self.store.keys_matching(pattern)).await {
                Ok(keys) => matched.extend(keys),
                Err(e) => self.absorb("scan", pattern, &e),
            }
        }
        matched.sort();
        matched.dedup();

        let removed = self.remove_keys("related", &matched).await;
        info!(resource, matched = matched.len(), removed, "♻️ Related caches revalidated");
        Ok(removed)
    }

    /// Run every invalidation `event` requires.
    pub async fn apply(&self, event: &CacheEvent) -> Result<u64, CacheError> {
        let results = futures::future::join_all(
            event
                .invalidations()
                .into_iter()
                .map(|invalidation| self.run_invalidation(invalidation)),
        )
        .await;

        let mut removed = 0;
        for result in results {
            removed += result?;
        }
        debug!(event = ?event, removed, "Applied cache invalidations");
        Ok(removed)
    }

    async fn run_invalidation(&self, invalidation: Invalidation) -> Result<u64, CacheError> {
        match invalidation.scope {
            InvalidationScope::Key => {
                let key = self.key(invalidation.resource, &invalidation.params)?;
                Ok(self.invalidate(&key).await)
            }
            InvalidationScope::Related => {
                self.invalidate_related(invalidation.resource, &invalidation.params)
                    .await
            }
        }
    }

    /// Round-trip latency to the store
    pub async fn health_check(&self) -> Result<Duration, CacheError> {
        let start = Instant::now();
        self.guarded("ping", self.store.ping()).await?;
        Ok(start.elapsed())
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            backend: self.backend(),
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            store_errors: self.counters.store_errors.load(Ordering::Relaxed),
            invalidated: self.counters.invalidated.load(Ordering::Relaxed),
        }
    }

    pub(crate) async fn marker_present(&self, marker: &str) -> Result<bool, CacheError> {
        self.guarded("get", self.store.get(marker))
            .await
            .map(|value| value.is_some())
    }

    pub(crate) async fn put_marker(&self, marker: &str) -> Result<(), CacheError> {
        self.guarded("set", self.store.set_ex(marker, "1", self.view_marker_ttl))
            .await
    }

    pub(crate) fn absorb(&self, operation: &'static str, key: &str, err: &CacheError) {
        self.counters.store_errors.fetch_add(1, Ordering::Relaxed);
        observability::record_store_error(self.backend(), operation);
        warn!(operation, key = %key, error = %err, "⚠️ Cache store failure ignored");
    }

    async fn remove_keys(&self, kind: &'static str, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        match self.guarded("delete", self.store.delete(keys)).await {
            Ok(removed) => {
                self.counters.invalidated.fetch_add(removed, Ordering::Relaxed);
                observability::record_invalidation(self.backend(), kind, removed);
                debug!(kind, requested = keys.len(), removed, "🗑️ Cache keys deleted");
                removed
            }
            Err(e) => {
                self.absorb("delete", &keys.join(","), &e);
                0
            }
        }
    }

    fn record_access(&self, key: &CacheKey, hit: bool) {
        let counter = if hit { &self.counters.hits } else { &self.counters.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        observability::record_cache_access(self.backend(), key.resource(), hit);
    }

    async fn guarded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout {
                operation,
                timeout: self.op_timeout,
            }),
        }
    }
}
