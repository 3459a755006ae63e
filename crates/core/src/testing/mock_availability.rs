//! Mock availability provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::provider::{
    AvailabilityProvider, AvailabilityTitle, FailureCause, ProviderFailure, ProviderOperation,
    Region, SortSpec,
};
use crate::record::TitleId;

/// A recorded availability call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAvailabilityCall {
    List {
        region: Region,
        page: u32,
        sort: SortSpec,
    },
    Search {
        query: String,
        region: Region,
        page: u32,
    },
    Detail {
        id: TitleId,
    },
    Sources {
        id: TitleId,
        region: Region,
    },
}

/// Mock implementation of the AvailabilityProvider trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable listings per page (any region, any sort)
/// - Return configurable search results (page 1 only)
/// - Track calls for assertions
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// use streamdex_core::testing::{MockAvailabilityProvider, fixtures};
///
/// let provider = MockAvailabilityProvider::new();
/// provider.set_listing(1, vec![fixtures::listing_with_poster(1, "Heat")]).await;
///
/// let items = provider.list(&region, 1, SortSpec::Default).await?;
/// assert_eq!(items.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockAvailabilityProvider {
    /// Listing items by page number.
    listings: Arc<RwLock<HashMap<u32, Vec<AvailabilityTitle>>>>,
    /// Search results by query text.
    search_results: Arc<RwLock<HashMap<String, Vec<AvailabilityTitle>>>>,
    /// Full details by title id.
    details: Arc<RwLock<HashMap<TitleId, AvailabilityTitle>>>,
    /// Source names by title id.
    sources: Arc<RwLock<HashMap<TitleId, Vec<String>>>>,
    /// Pages whose listing always fails.
    failing_pages: Arc<RwLock<HashSet<u32>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedAvailabilityCall>>>,
    /// If set, the next operation will fail with this cause.
    next_error: Arc<RwLock<Option<FailureCause>>>,
}

impl Default for MockAvailabilityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAvailabilityProvider {
    /// Create a new empty mock provider.
    pub fn new() -> Self {
        Self {
            listings: Arc::new(RwLock::new(HashMap::new())),
            search_results: Arc::new(RwLock::new(HashMap::new())),
            details: Arc::new(RwLock::new(HashMap::new())),
            sources: Arc::new(RwLock::new(HashMap::new())),
            failing_pages: Arc::new(RwLock::new(HashSet::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the listing returned for a page.
    pub async fn set_listing(&self, page: u32, items: Vec<AvailabilityTitle>) {
        self.listings.write().await.insert(page, items);
    }

    /// Set the results returned for a search query.
    pub async fn set_search_results(&self, query: &str, items: Vec<AvailabilityTitle>) {
        self.search_results
            .write()
            .await
            .insert(query.to_string(), items);
    }

    /// Add a title returned by `detail`.
    pub async fn add_detail(&self, item: AvailabilityTitle) {
        self.details.write().await.insert(item.id.clone(), item);
    }

    /// Set the source names returned for a title.
    pub async fn set_sources(&self, id: &TitleId, names: Vec<String>) {
        self.sources.write().await.insert(id.clone(), names);
    }

    /// Make every listing call for a page fail.
    pub async fn fail_page(&self, page: u32) {
        self.failing_pages.write().await.insert(page);
    }

    /// Let listing calls for a page succeed again.
    pub async fn recover_page(&self, page: u32) {
        self.failing_pages.write().await.remove(&page);
    }

    /// Set an error to be returned on the next operation.
    pub async fn set_next_error(&self, cause: FailureCause) {
        *self.next_error.write().await = Some(cause);
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedAvailabilityCall> {
        self.calls.read().await.clone()
    }

    /// Number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Clear recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn record(
        &self,
        operation: ProviderOperation,
        call: RecordedAvailabilityCall,
    ) -> Result<(), ProviderFailure> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(cause) => Err(ProviderFailure::availability(operation, cause)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AvailabilityProvider for MockAvailabilityProvider {
    async fn list(
        &self,
        region: &Region,
        page: u32,
        sort: SortSpec,
    ) -> Result<Vec<AvailabilityTitle>, ProviderFailure> {
        self.record(
            ProviderOperation::List,
            RecordedAvailabilityCall::List {
                region: region.clone(),
                page,
                sort,
            },
        )
        .await?;

        if self.failing_pages.read().await.contains(&page) {
            return Err(ProviderFailure::availability(
                ProviderOperation::List,
                FailureCause::Status {
                    status: 503,
                    message: format!("page {} unavailable", page),
                },
            ));
        }

        Ok(self
            .listings
            .read()
            .await
            .get(&page)
            .cloned()
            .unwrap_or_default())
    }

    async fn search(
        &self,
        query: &str,
        region: &Region,
        page: u32,
    ) -> Result<Vec<AvailabilityTitle>, ProviderFailure> {
        self.record(
            ProviderOperation::Search,
            RecordedAvailabilityCall::Search {
                query: query.to_string(),
                region: region.clone(),
                page,
            },
        )
        .await?;

        if page != 1 {
            return Ok(Vec::new());
        }
        Ok(self
            .search_results
            .read()
            .await
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn detail(&self, id: &TitleId) -> Result<AvailabilityTitle, ProviderFailure> {
        self.record(
            ProviderOperation::Detail,
            RecordedAvailabilityCall::Detail { id: id.clone() },
        )
        .await?;

        self.details.read().await.get(id).cloned().ok_or_else(|| {
            ProviderFailure::availability(
                ProviderOperation::Detail,
                FailureCause::NotFound(format!("title {}", id)),
            )
        })
    }

    async fn sources(
        &self,
        id: &TitleId,
        region: &Region,
    ) -> Result<Vec<String>, ProviderFailure> {
        self.record(
            ProviderOperation::Sources,
            RecordedAvailabilityCall::Sources {
                id: id.clone(),
                region: region.clone(),
            },
        )
        .await?;

        Ok(self
            .sources
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}
