//! Page aggregation.
//!
//! The aggregator turns one `(operation, region, page)` request into a page
//! of merged [`CatalogRecord`]s:
//!
//! 1. Look the page up in the cache.
//! 2. On a miss, call the availability provider's listing.
//! 3. Enrich every item from the metadata provider concurrently.
//! 4. Merge, drop image-less records, cache the result.
//!
//! Provider failures never reach the caller. A failed listing yields an
//! empty page that is not cached; a failed enrichment merges that one item
//! without metadata.

mod types;

pub use types::*;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheValue};
use crate::metrics;
use crate::provider::{
    AvailabilityProvider, AvailabilityTitle, MetadataProvider, MetadataTitle, ProviderFailure,
    Region,
};
use crate::record::{merge, CatalogRecord, TitleId};

/// Source of catalog pages for a collector.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page. Never fails; an unavailable page is empty.
    async fn fetch_page(&self, request: &PageRequest) -> CatalogPage;

    /// Platform names for one title in a region. Empty when unavailable.
    async fn fetch_platforms(&self, id: &TitleId, region: &Region) -> Vec<String>;
}

/// Cache-through page pipeline over the two providers.
pub struct PageAggregator {
    availability: Arc<dyn AvailabilityProvider>,
    metadata: Arc<dyn MetadataProvider>,
    cache: Arc<dyn Cache>,
    config: AggregatorConfig,
}

impl PageAggregator {
    pub fn new(
        availability: Arc<dyn AvailabilityProvider>,
        metadata: Arc<dyn MetadataProvider>,
        cache: Arc<dyn Cache>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            availability,
            metadata,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fetch one page of merged records.
    pub async fn fetch_page(&self, request: &PageRequest) -> CatalogPage {
        let start = Instant::now();
        let operation = request.operation.as_str();
        let key = request.cache_key();

        let page = match self.cached(&key).await {
            Some(CacheValue::Records(records)) => {
                debug!("Cache hit for {}", key);
                CatalogPage::new(records)
            }
            Some(_) => {
                warn!("Unexpected cached value kind for {}, refetching", key);
                self.fetch_page_uncached(request, &key).await
            }
            None => self.fetch_page_uncached(request, &key).await,
        };

        metrics::PAGE_FETCH_DURATION
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
        metrics::PAGE_RECORDS
            .with_label_values(&[operation])
            .observe(page.len() as f64);

        page
    }

    async fn fetch_page_uncached(&self, request: &PageRequest, key: &str) -> CatalogPage {
        let items = match self.list(request).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Listing for {} failed: {}", key, e);
                record_failure(&e);
                return CatalogPage::empty();
            }
        };

        debug!("Listing for {} returned {} items", key, items.len());

        let enriched = join_all(items.iter().map(|item| self.enrich(item))).await;
        let listed = items.len();
        let records: Vec<CatalogRecord> = items
            .iter()
            .zip(enriched)
            .map(|(item, metadata)| merge(item, metadata.as_ref()))
            .filter(CatalogRecord::has_image)
            .collect();

        info!(
            "Aggregated {} ({} listed, {} kept)",
            key,
            listed,
            records.len()
        );

        self.store(key, CacheValue::Records(records.clone()), self.config.page_ttl)
            .await;

        CatalogPage::new(records)
    }

    async fn list(&self, request: &PageRequest) -> Result<Vec<AvailabilityTitle>, ProviderFailure> {
        match &request.operation {
            PageOperation::Search { query } => {
                self.availability
                    .search(query.trim(), &request.region, request.page)
                    .await
            }
            operation => {
                let sort = operation.sort().unwrap_or_default();
                self.availability
                    .list(&request.region, request.page, sort)
                    .await
            }
        }
    }

    /// Metadata for one listing item, or `None` if it cannot be found.
    async fn enrich(&self, item: &AvailabilityTitle) -> Option<MetadataTitle> {
        let key = item.metadata_key()?;
        match self.metadata.detail(&key).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Enrichment of {} ({}) failed: {}", item.id, key, e);
                record_failure(&e);
                None
            }
        }
    }

    /// Platform names streaming a title in a region.
    pub async fn fetch_platforms(&self, id: &TitleId, region: &Region) -> Vec<String> {
        let key = sources_key(id, region);

        if let Some(cached) = self.cached(&key).await {
            if let CacheValue::Platforms(names) = cached {
                return names;
            }
            warn!("Unexpected cached value kind for {}, refetching", key);
        }

        match self.availability.sources(id, region).await {
            Ok(names) => {
                debug!("Found {} platforms for {}", names.len(), key);
                self.store(
                    &key,
                    CacheValue::Platforms(names.clone()),
                    self.config.sources_ttl,
                )
                .await;
                names
            }
            Err(e) => {
                warn!("Sources for {} failed: {}", key, e);
                record_failure(&e);
                Vec::new()
            }
        }
    }

    /// Full details of one title, enriched from the metadata provider.
    ///
    /// Unlike pages, image-less details are returned as is.
    pub async fn fetch_details(&self, id: &TitleId) -> Option<CatalogRecord> {
        let key = details_key(id);

        if let Some(cached) = self.cached(&key).await {
            if let CacheValue::Record(record) = cached {
                return Some(record);
            }
            warn!("Unexpected cached value kind for {}, refetching", key);
        }

        let item = match self.availability.detail(id).await {
            Ok(item) => item,
            Err(e) => {
                warn!("Details for {} failed: {}", id, e);
                record_failure(&e);
                return None;
            }
        };

        let metadata = self.enrich(&item).await;
        let record = merge(&item, metadata.as_ref());

        self.store(
            &key,
            CacheValue::Record(record.clone()),
            self.config.sources_ttl,
        )
        .await;

        Some(record)
    }

    async fn cached(&self, key: &str) -> Option<CacheValue> {
        match self.cache.get(key).await {
            Ok(Some(value)) => {
                metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                Some(value)
            }
            Ok(None) => {
                metrics::CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                None
            }
            Err(e) => {
                metrics::CACHE_LOOKUPS.with_label_values(&["error"]).inc();
                warn!("Cache read for {} failed, treating as miss: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: &str, value: CacheValue, ttl: Duration) {
        if let Err(e) = self.cache.set(key, value, ttl).await {
            warn!("Cache write for {} failed: {}", key, e);
        }
    }
}

#[async_trait]
impl PageSource for PageAggregator {
    async fn fetch_page(&self, request: &PageRequest) -> CatalogPage {
        PageAggregator::fetch_page(self, request).await
    }

    async fn fetch_platforms(&self, id: &TitleId, region: &Region) -> Vec<String> {
        PageAggregator::fetch_platforms(self, id, region).await
    }
}

fn record_failure(failure: &ProviderFailure) {
    metrics::PROVIDER_FAILURES
        .with_label_values(&[failure.provider.as_str(), failure.operation.as_str()])
        .inc();
}
