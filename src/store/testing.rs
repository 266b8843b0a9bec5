//! Fault-injecting stores for exercising the cache's failure paths.

use async_trait::async_trait;
use std::time::Duration;

use super::{KeyValueStore, StoreError};

fn refused() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

/// Every call fails
pub(crate) struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(refused())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(refused())
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, StoreError> {
        Err(refused())
    }

    async fn keys_matching(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        Err(refused())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(refused())
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

/// Never answers
pub(crate) struct StalledStore;

#[async_trait]
impl KeyValueStore for StalledStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        std::future::pending().await
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn keys_matching(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        std::future::pending().await
    }

    fn backend(&self) -> &'static str {
        "stalled"
    }
}
