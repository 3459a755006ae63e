//! Page aggregation integration tests.
//!
//! These tests drive the page aggregator with mock providers and real cache
//! backends:
//! - Cold cache fetch with partial enrichment failure
//! - Cache idempotence and expiry
//! - Unavailable cache backend
//! - Concurrent enrichment
//! - Persistence through the SQLite backend

use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use streamdex_core::{
    AggregatorConfig, Cache, CacheValue, MemoryCache, PageAggregator, PageOperation, PageRequest,
    Region, SqliteCache,
    testing::{FailingCache, MockAvailabilityProvider, MockMetadataProvider, fixtures},
};

/// Test helper wiring an aggregator to mock providers.
struct TestHarness {
    aggregator: PageAggregator,
    availability: Arc<MockAvailabilityProvider>,
    metadata: Arc<MockMetadataProvider>,
    cache: Arc<dyn Cache>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_cache(Arc::new(MemoryCache::new()), AggregatorConfig::default())
    }

    fn with_cache(cache: Arc<dyn Cache>, config: AggregatorConfig) -> Self {
        let availability = Arc::new(MockAvailabilityProvider::new());
        let metadata = Arc::new(MockMetadataProvider::new());
        let aggregator = PageAggregator::new(
            availability.clone(),
            metadata.clone(),
            cache.clone(),
            config,
        );
        Self {
            aggregator,
            availability,
            metadata,
            cache,
        }
    }

    /// Listing of `count` linked items on `page`, with metadata for each.
    async fn seed_page(&self, page: u32, first_id: u64, count: u64) {
        let mut items = Vec::new();
        for id in first_id..first_id + count {
            let title = format!("Title {}", id);
            items.push(fixtures::linked_listing(id, &title, 1000 + id));
            self.metadata
                .add_title(fixtures::metadata_title(1000 + id, &title))
                .await;
        }
        self.availability.set_listing(page, items).await;
    }
}

fn us() -> Region {
    Region::parse("US").unwrap()
}

#[tokio::test]
async fn test_cold_cache_with_one_failed_enrichment() {
    let harness = TestHarness::new();
    harness.seed_page(1, 1, 3).await;
    harness.metadata.fail_title(1002).await;

    let request = PageRequest::new(PageOperation::ByRegion, us(), 1);
    let page = harness.aggregator.fetch_page(&request).await;

    assert_eq!(page.len(), 3);
    let with_overview = page.records.iter().filter(|r| r.overview.is_some()).count();
    assert_eq!(with_overview, 2);

    let failed = &page.records[1];
    assert_eq!(failed.title, "Title 2");
    assert!(failed.overview.is_none());
    assert!(failed.genres.is_empty());
    assert!(failed.poster_url.is_some());

    match harness.cache.get(&request.cache_key()).await.unwrap() {
        Some(CacheValue::Records(records)) => assert_eq!(records.len(), 3),
        other => panic!("expected cached records, got {:?}", other),
    }
}

#[tokio::test]
async fn test_listing_order_preserved() {
    let harness = TestHarness::new();
    harness.seed_page(1, 10, 5).await;
    harness
        .metadata
        .set_detail_delay(Duration::from_millis(5))
        .await;

    let request = PageRequest::new(PageOperation::Popular, us(), 1);
    let page = harness.aggregator.fetch_page(&request).await;

    let titles: Vec<&str> = page.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Title 10", "Title 11", "Title 12", "Title 13", "Title 14"]
    );
}

#[tokio::test]
async fn test_cache_idempotence() {
    let harness = TestHarness::new();
    harness.seed_page(1, 1, 4).await;

    let request = PageRequest::new(PageOperation::ByRegion, us(), 1);
    let first = harness.aggregator.fetch_page(&request).await;
    let availability_calls = harness.availability.call_count().await;
    let metadata_calls = harness.metadata.call_count().await;

    let second = harness.aggregator.fetch_page(&request).await;

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
    assert_eq!(harness.availability.call_count().await, availability_calls);
    assert_eq!(harness.metadata.call_count().await, metadata_calls);
    assert_eq!(availability_calls, 1);
    assert_eq!(metadata_calls, 4);
}

#[tokio::test]
async fn test_distinct_shapes_are_cached_separately() {
    let harness = TestHarness::new();
    harness.seed_page(1, 1, 2).await;

    let by_region = PageRequest::new(PageOperation::ByRegion, us(), 1);
    let popular = PageRequest::new(PageOperation::Popular, us(), 1);
    harness.aggregator.fetch_page(&by_region).await;
    harness.aggregator.fetch_page(&popular).await;
    harness.aggregator.fetch_page(&by_region).await;

    assert_eq!(harness.availability.call_count().await, 2);
}

#[tokio::test]
async fn test_expired_page_is_refetched() {
    let harness = TestHarness::with_cache(
        Arc::new(MemoryCache::new()),
        AggregatorConfig {
            page_ttl: Duration::from_millis(30),
            ..AggregatorConfig::default()
        },
    );
    harness.seed_page(1, 1, 2).await;

    let request = PageRequest::new(PageOperation::ByRegion, us(), 1);
    harness.aggregator.fetch_page(&request).await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    let page = harness.aggregator.fetch_page(&request).await;

    assert_eq!(page.len(), 2);
    assert_eq!(harness.availability.call_count().await, 2);
}

#[tokio::test]
async fn test_enrichment_runs_concurrently() {
    let harness = TestHarness::new();
    harness.seed_page(1, 1, 10).await;
    harness
        .metadata
        .set_detail_delay(Duration::from_millis(100))
        .await;

    let request = PageRequest::new(PageOperation::ByRegion, us(), 1);
    let start = Instant::now();
    let page = harness.aggregator.fetch_page(&request).await;

    assert_eq!(page.len(), 10);
    // Ten sequential lookups would take at least a second.
    assert!(start.elapsed() < Duration::from_millis(600));
}

#[tokio::test]
async fn test_sqlite_cache_shared_between_aggregators() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("cache.db");
    let request = PageRequest::new(PageOperation::search("title"), us(), 1);

    let first = TestHarness::with_cache(
        Arc::new(SqliteCache::new(&path).expect("Failed to open cache")),
        AggregatorConfig::default(),
    );
    first
        .availability
        .set_search_results("title", vec![fixtures::listing_with_poster(1, "Title 1")])
        .await;
    let page = first.aggregator.fetch_page(&request).await;
    assert_eq!(page.len(), 1);

    let second = TestHarness::with_cache(
        Arc::new(SqliteCache::new(&path).expect("Failed to open cache")),
        AggregatorConfig::default(),
    );
    let cached = second.aggregator.fetch_page(&request).await;

    assert_eq!(cached, page);
    assert_eq!(second.availability.call_count().await, 0);
}

#[tokio::test]
async fn test_unavailable_cache_falls_through_to_providers() {
    let cache = Arc::new(FailingCache::new());
    let harness = TestHarness::with_cache(cache.clone(), AggregatorConfig::default());
    harness.seed_page(1, 1, 3).await;

    let request = PageRequest::new(PageOperation::ByRegion, us(), 1);
    let first = harness.aggregator.fetch_page(&request).await;
    let second = harness.aggregator.fetch_page(&request).await;

    assert_eq!(first.len(), 3);
    assert!(first.records.iter().all(|r| r.overview.is_some()));
    assert_eq!(second, first);
    assert_eq!(harness.availability.call_count().await, 2);
    assert_eq!(cache.get_count(), 2);
    assert_eq!(cache.set_count(), 2);
}
