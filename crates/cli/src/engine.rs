//! Wiring of providers, cache and aggregator from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::info;

use streamdex_core::{
    spawn_sweeper, AggregatorConfig, AvailabilityProvider, Cache, CacheBackend, Config,
    IncrementalCollector, MemoryCache, MetadataProvider, PageAggregator, QueryShape, SqliteCache,
    TmdbClient, WatchmodeClient,
};

/// Everything a command needs to talk to the catalog.
pub struct Engine {
    aggregator: Arc<PageAggregator>,
    config: Config,
    sweeper: Option<JoinHandle<()>>,
}

impl Engine {
    /// Build the engine described by `config`.
    ///
    /// Must be called from within a Tokio runtime when the cache sweeper is
    /// enabled.
    pub fn from_config(config: &Config) -> Result<Self> {
        let availability: Arc<dyn AvailabilityProvider> = Arc::new(
            WatchmodeClient::new(config.availability.clone())
                .context("Failed to create availability client")?,
        );
        let metadata: Arc<dyn MetadataProvider> = Arc::new(
            TmdbClient::new(config.metadata.clone()).context("Failed to create metadata client")?,
        );

        let cache: Arc<dyn Cache> = match config.cache.backend {
            CacheBackend::Memory => {
                info!("Using in-memory cache");
                Arc::new(MemoryCache::new())
            }
            CacheBackend::Sqlite => {
                info!("Using SQLite cache at {:?}", config.cache.path);
                Arc::new(
                    SqliteCache::new(&config.cache.path).with_context(|| {
                        format!("Failed to open cache at {:?}", config.cache.path)
                    })?,
                )
            }
        };

        let sweeper = (config.cache.sweep_interval_secs > 0).then(|| {
            spawn_sweeper(
                &cache,
                Duration::from_secs(config.cache.sweep_interval_secs),
            )
        });

        Ok(Self::with_parts(
            availability,
            metadata,
            cache,
            config.clone(),
            sweeper,
        ))
    }

    /// Build an engine from already constructed parts.
    pub fn with_parts(
        availability: Arc<dyn AvailabilityProvider>,
        metadata: Arc<dyn MetadataProvider>,
        cache: Arc<dyn Cache>,
        config: Config,
        sweeper: Option<JoinHandle<()>>,
    ) -> Self {
        let aggregator = Arc::new(PageAggregator::new(
            availability,
            metadata,
            cache,
            AggregatorConfig::from(&config.cache),
        ));
        Self {
            aggregator,
            config,
            sweeper,
        }
    }

    pub fn aggregator(&self) -> &PageAggregator {
        &self.aggregator
    }

    /// Start a collection session for `shape`.
    pub fn collector(&self, shape: QueryShape) -> IncrementalCollector {
        IncrementalCollector::new(
            self.aggregator.clone(),
            shape,
            self.config.collector.clone(),
        )
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamdex_core::testing::{fixtures, MockAvailabilityProvider, MockMetadataProvider};
    use streamdex_core::{load_config_from_str, FetchOutcome, PageOperation, Region};

    fn config() -> Config {
        load_config_from_str(
            r#"
[availability]
api_key = "wm"

[metadata]
api_key = "tmdb"

[collector]
max_records = 2
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_from_config_with_memory_cache() {
        let engine = Engine::from_config(&config()).unwrap();
        assert_eq!(engine.aggregator().config().page_ttl, Duration::from_secs(300));
        assert!(engine.sweeper.is_some());
    }

    #[tokio::test]
    async fn test_from_config_with_sqlite_cache() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = config();
        config.cache.backend = CacheBackend::Sqlite;
        config.cache.path = temp_dir.path().join("cache.db");
        config.cache.sweep_interval_secs = 0;

        let engine = Engine::from_config(&config).unwrap();
        assert!(engine.sweeper.is_none());
        assert!(config.cache.path.exists());
    }

    #[tokio::test]
    async fn test_collector_uses_configured_cap() {
        let availability = Arc::new(MockAvailabilityProvider::new());
        availability
            .set_listing(
                1,
                vec![
                    fixtures::listing_with_poster(1, "A"),
                    fixtures::listing_with_poster(2, "B"),
                    fixtures::listing_with_poster(3, "C"),
                ],
            )
            .await;
        let engine = Engine::with_parts(
            availability,
            Arc::new(MockMetadataProvider::new()),
            Arc::new(MemoryCache::new()),
            config(),
            None,
        );

        let collector = engine.collector(QueryShape::new(
            Region::parse("US").unwrap(),
            PageOperation::ByRegion,
        ));
        collector.request_next().await;

        assert_eq!(collector.records().len(), 2);
        assert_eq!(collector.request_next().await, FetchOutcome::Exhausted);
    }
}
