//! Process-local cache backed by moka.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;

use super::{CacheError, CacheStore, Fingerprint};

/// In-memory TTL cache. Entries are not shared with other processes.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, String>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &Fingerprint) -> Result<Option<String>, CacheError> {
        let value = self.inner.get(key.as_str());
        if value.is_some() {
            log::debug!("Cache hit for {}", key);
        } else {
            log::debug!("Cache miss for {}", key);
        }
        Ok(value)
    }

    async fn set(&self, key: &Fingerprint, value: &str) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
