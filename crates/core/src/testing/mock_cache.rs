//! Cache double whose backend is always unavailable.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::cache::{Cache, CacheError, CacheValue};

/// Cache that fails every operation with [`CacheError::Backend`].
///
/// Counts reads and writes so tests can check the cache was consulted.
#[derive(Debug, Default)]
pub struct FailingCache {
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls made so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls made so far.
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    fn unavailable() -> CacheError {
        CacheError::Backend("cache backend unavailable".to_string())
    }
}

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<CacheValue>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn set(&self, _key: &str, _value: CacheValue, _ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
        Err(Self::unavailable())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Err(Self::unavailable())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Err(Self::unavailable())
    }
}
