//! TTL cache for aggregated results.
//!
//! The cache knows nothing about providers: it maps deterministic query keys
//! to immutable values that expire after a per-entry TTL. Entries are only
//! ever replaced wholesale by `set`, never mutated in place.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::record::CatalogRecord;

/// Errors from a cache backend.
///
/// Callers treat any of these as a miss and carry on uncached.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    /// One page of records, in listing order.
    Records(Vec<CatalogRecord>),
    /// Platform names for one title in one region.
    Platforms(Vec<String>),
    /// Full details of one title.
    Record(CatalogRecord),
}

/// Key/value storage with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a live entry. Expired entries are misses.
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, CacheError>;

    /// Store a value, replacing any previous entry for the key.
    async fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<(), CacheError>;

    /// Remove one entry.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, CacheError>;
}

/// Periodically purge expired entries.
///
/// The task holds a weak reference and exits once the cache is dropped.
pub fn spawn_sweeper(cache: &Arc<dyn Cache>, interval: Duration) -> JoinHandle<()> {
    let weak: Weak<dyn Cache> = Arc::downgrade(cache);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(cache) = weak.upgrade() else {
                debug!("Cache dropped, stopping sweeper");
                break;
            };
            match cache.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!("Purged {} expired cache entries", removed),
                Err(e) => warn!("Cache sweep failed: {}", e),
            }
        }
    })
}
