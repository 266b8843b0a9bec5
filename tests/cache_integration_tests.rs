#[cfg(test)]
mod cache_integration_tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dashmap::DashMap;
    use serde_json::{json, Value};
    use shared::{AppConfig, CacheBackend, CacheConfig, Config, RedisConfig};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use vidtube_ws::{
        create_app_router, state::AppState, CacheEvent, CacheResource, KeyValueStore, MemoryStore,
        ResponseCache, StoreError, ViewCounter, ViewOutcome, ViewTracker,
    };

    fn memory_config() -> Config {
        Config {
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
                pool_size: 1,
                connection_timeout_seconds: 1,
            },
            cache: CacheConfig {
                backend: CacheBackend::Memory,
                ..CacheConfig::default()
            },
            app: AppConfig {
                environment: "test".to_string(),
                log_level: "debug".to_string(),
                port: 0,
            },
        }
    }

    fn memory_cache() -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryStore::new()), &memory_config().cache)
    }

    struct DownStore;

    #[async_trait]
    impl KeyValueStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn delete(&self, _keys: &[String]) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn keys_matching(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        fn backend(&self) -> &'static str {
            "down"
        }
    }

    #[derive(Default)]
    struct VideoTable {
        views: DashMap<String, u64>,
    }

    #[async_trait]
    impl ViewCounter for VideoTable {
        async fn increment_views(&self, video_id: &str) -> anyhow::Result<u64> {
            let mut views = self.views.entry(video_id.to_string()).or_insert(0);
            *views += 1;
            Ok(*views)
        }
    }

    #[tokio::test]
    async fn test_video_lookup_scenario() {
        println!("\n🚀 Key -> write -> read -> revalidate -> read");
        let cache = memory_cache();

        let key = cache
            .key(CacheResource::Video, &[json!("64f1a2b3c4d5e6f7a8b9c0d1"), json!("guest")])
            .unwrap();
        let again = cache
            .key("video", &[json!("64f1a2b3c4d5e6f7a8b9c0d1"), json!("guest")])
            .unwrap();
        assert_eq!(key, again, "Key generation must be deterministic");
        assert_eq!(
            key.as_str(),
            r#"app:video:"64f1a2b3c4d5e6f7a8b9c0d1":"guest""#
        );
        println!("  ✅ Key: {}", key);

        cache.set(&key, &json!({"title": "x"}), None).await;
        assert_eq!(cache.get::<Value>(&key).await, Some(json!({"title": "x"})));
        println!("  ✅ Cached value read back");

        cache.invalidate(&key).await;
        assert_eq!(cache.get::<Value>(&key).await, None);
        println!("  ✅ Revalidated entry is absent");
    }

    #[tokio::test]
    async fn test_query_objects_hit_regardless_of_field_order() {
        let cache = memory_cache();
        let first = cache
            .key("all-videos", &[json!({"page": "1", "sort": "new"})])
            .unwrap();
        let second = cache
            .key("all-videos", &[json!({"sort": "new", "page": "1"})])
            .unwrap();

        cache.set(&first, &json!(["v1", "v2"]), None).await;
        assert_eq!(cache.get::<Value>(&second).await, Some(json!(["v1", "v2"])));
    }

    #[tokio::test]
    async fn test_playlist_update_flow() {
        let cache = memory_cache();
        let playlist = cache.key(CacheResource::Playlist, &[json!("p1")]).unwrap();
        let owner_page = cache
            .key(CacheResource::UserPlaylist, &[json!("u1"), json!({"page": "1"})])
            .unwrap();
        let collection = cache.key(CacheResource::UserCollection, &[json!("u1")]).unwrap();
        let stranger = cache.key(CacheResource::UserCollection, &[json!("u2")]).unwrap();
        for key in [&playlist, &owner_page, &collection, &stranger] {
            cache.set(key, &json!({"cached": true}), None).await;
        }

        let removed = cache
            .apply(&CacheEvent::PlaylistUpdated {
                playlist_id: "p1".to_string(),
                owner_id: "u1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(removed, 3);
        assert!(cache.get::<Value>(&stranger).await.is_some());
    }

    #[tokio::test]
    async fn test_read_through_survives_dead_store() {
        let cache = ResponseCache::new(Arc::new(DownStore), &memory_config().cache);
        let key = cache.key(CacheResource::Subscribers, &[json!("c1")]).unwrap();

        let count: u64 = cache
            .get_or_compute(&key, None, || async { Ok::<_, anyhow::Error>(12) })
            .await
            .unwrap();

        assert_eq!(count, 12);
        assert_eq!(cache.stats().store_errors, 2);
    }

    #[tokio::test]
    async fn test_view_counted_once_per_viewer() {
        let cache = memory_cache();
        let table = Arc::new(VideoTable::default());
        let tracker = ViewTracker::new(cache, table.clone());

        assert_eq!(
            tracker.record_view("v1", "203.0.113.7").await.unwrap(),
            ViewOutcome::Added { views: 1 }
        );
        assert_eq!(
            tracker.record_view("v1", "203.0.113.7").await.unwrap(),
            ViewOutcome::NotAdded
        );
        assert_eq!(table.views.get("v1").map(|v| *v), Some(1));
    }

    #[tokio::test]
    async fn test_router_reports_cache_stats() {
        let state = Arc::new(AppState::new(memory_config()).await.unwrap());
        let key = state.cache.key("video", &[json!("v1")]).unwrap();
        state.cache.set(&key, &json!(1), None).await;
        state.cache.get::<Value>(&key).await;

        let app = create_app_router(state);
        let response = app
            .oneshot(Request::builder().uri("/metrics/cache").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let stats: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["backend"], "memory");
        assert_eq!(stats["hits"], 1);
        assert_eq!(stats["hit_rate"], 1.0);
    }

    #[tokio::test]
    async fn test_router_serves_prometheus_text() {
        let state = Arc::new(AppState::new(memory_config()).await.unwrap());
        let app = create_app_router(state);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
