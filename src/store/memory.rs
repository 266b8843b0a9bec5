use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant};
use tracing::{debug, info};

use super::{KeyValueStore, StoreError};

const CLEANUP_INTERVAL_SECS: u64 = 60;

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process store with the same expiry and pattern semantics as Redis.
///
/// Expiry is measured on the Tokio clock so paused-time tests can advance past a TTL.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of physically stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Reads already hide them; this only reclaims memory.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("🧹 MemoryStore purge: removed {} expired entries", removed);
        }
        removed
    }

    /// Start background purge task
    pub fn start_background_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut cleanup_interval = interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            info!("🔄 Started MemoryStore cleanup task (interval: {}s)", CLEANUP_INTERVAL_SECS);

            loop {
                cleanup_interval.tick().await;
                store.purge_expired();
            }
        })
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Expired entries are dropped lazily
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut deleted = 0;
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(key) {
                if entry.is_live(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_live(now) && matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Translate a Redis glob (`*`, `?`, `[...]`, `\x`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, StoreError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(&regex::escape("\\")),
            },
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push_str(&regex::escape(&escaped.to_string()));
                            }
                        }
                        '[' | '&' | '~' => {
                            out.push('\\');
                            out.push(inner);
                        }
                        other => out.push(other),
                    }
                }
                if !closed {
                    return Err(StoreError::Pattern {
                        pattern: pattern.to_string(),
                        message: "unterminated character class".to_string(),
                    });
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');

    Regex::new(&out).map_err(|e| StoreError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store.set_ex("app:video:\"1\"", "{\"title\":\"x\"}", Duration::from_secs(60)).await.unwrap();
        assert_eq!(
            store.get("app:video:\"1\"").await.unwrap().as_deref(),
            Some("{\"title\":\"x\"}")
        );
        assert_eq!(store.get("app:video:\"2\"").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_expiry() {
        let store = MemoryStore::new();
        store.set_ex("k", "v1", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        store.set_ex("k", "v2", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let store = MemoryStore::new();
        store.set_ex("a", "1", Duration::from_secs(60)).await.unwrap();
        let deleted = store
            .delete(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.delete(&["a".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keys_matching_glob() {
        let store = MemoryStore::new();
        for key in ["app:video:\"1\"", "app:video:\"2\"", "app:other:\"1\"", "app:video-likes:\"1\""] {
            store.set_ex(key, "x", Duration::from_secs(60)).await.unwrap();
        }

        let keys = store.keys_matching("app:video:*").await.unwrap();
        assert_eq!(keys, vec!["app:video:\"1\"".to_string(), "app:video:\"2\"".to_string()]);

        let keys = store.keys_matching("app:video:\"?\"").await.unwrap();
        assert_eq!(keys.len(), 2);

        let keys = store.keys_matching("app:video:\"[^2]\"").await.unwrap();
        assert_eq!(keys, vec!["app:video:\"1\"".to_string()]);
    }

    #[tokio::test]
    async fn test_escaped_metacharacters_match_literally() {
        let store = MemoryStore::new();
        store.set_ex("app:p:\"a*b\"", "x", Duration::from_secs(60)).await.unwrap();
        store.set_ex("app:p:\"aXYZb\"", "x", Duration::from_secs(60)).await.unwrap();

        let keys = store.keys_matching("app:p:\"a\\*b\"").await.unwrap();
        assert_eq!(keys, vec!["app:p:\"a*b\"".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_keys_are_not_listed_and_purged() {
        let store = MemoryStore::new();
        store.set_ex("app:video:\"1\"", "x", Duration::from_secs(1)).await.unwrap();
        store.set_ex("app:video:\"2\"", "x", Duration::from_secs(100)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.keys_matching("app:video:*").await.unwrap().len(), 1);
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unterminated_class_is_rejected() {
        assert!(matches!(glob_to_regex("app:[abc"), Err(StoreError::Pattern { .. })));
    }
}
