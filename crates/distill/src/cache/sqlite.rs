//! Cache backed by the shared SQLite database, visible to every process
//! that opens the same file.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{CacheError, CacheStore, Fingerprint};
use crate::db::{blocking, cache_repo, Database};

const MAX_TTL_DAYS: i64 = 36_500;

#[derive(Clone)]
pub struct SqliteCache {
    db: Database,
    ttl: Duration,
}

impl SqliteCache {
    pub fn new(db: Database, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Deletes expired rows. Expired rows are already invisible to `get`.
    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        let db = self.db.clone();
        let removed = blocking(move || cache_repo::purge_expired(&db, Utc::now())).await?;
        if removed > 0 {
            log::debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn get(&self, key: &Fingerprint) -> Result<Option<String>, CacheError> {
        let db = self.db.clone();
        let k = key.to_string();
        let value = blocking(move || cache_repo::get(&db, &k, Utc::now())).await?;
        if value.is_some() {
            log::debug!("Cache hit for {}", key);
        } else {
            log::debug!("Cache miss for {}", key);
        }
        Ok(value)
    }

    async fn set(&self, key: &Fingerprint, value: &str) -> Result<(), CacheError> {
        // Timestamps compare as text, so keep expiry within four-digit years.
        let max_ttl = chrono::Duration::days(MAX_TTL_DAYS);
        let ttl = chrono::Duration::from_std(self.ttl)
            .unwrap_or(max_ttl)
            .min(max_ttl);
        let expires_at = Utc::now() + ttl;
        let db = self.db.clone();
        let k = key.to_string();
        let v = value.to_string();
        blocking(move || cache_repo::put(&db, &k, &v, expires_at)).await?;
        Ok(())
    }
}
