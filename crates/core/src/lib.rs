pub mod aggregator;
pub mod cache;
pub mod collector;
pub mod config;
pub mod metrics;
pub mod provider;
pub mod record;
pub mod testing;

pub use aggregator::{
    AggregatorConfig, CatalogPage, PageAggregator, PageOperation, PageRequest, PageSource,
};
pub use cache::{spawn_sweeper, Cache, CacheError, CacheValue, MemoryCache, SqliteCache};
pub use collector::{
    should_prefetch, CollectorState, FetchOutcome, IncrementalCollector, QueryShape,
    ScrollDirection, ScrollObserver, ScrollPosition,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheBackend, CacheConfig,
    CollectorConfig, Config, ConfigError, SanitizedConfig,
};
pub use provider::{
    AvailabilityProvider, FailureCause, MetadataProvider, ProviderFailure, Region, TmdbClient,
    WatchmodeClient,
};
pub use record::{completeness, merge, CatalogRecord, MediaType, TitleId};
