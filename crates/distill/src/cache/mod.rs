//! Result cache keyed by request fingerprint.
//!
//! A miss is `Ok(None)`, never an error. Values expire after a fixed TTL
//! and `set` overwrites silently.

pub mod fingerprint;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::DatabaseError;

pub use fingerprint::{key_for, Fingerprint};
pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

/// Default time-to-live for cache entries.
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Database(#[from] DatabaseError),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &Fingerprint) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &Fingerprint, value: &str) -> Result<(), CacheError>;
}
