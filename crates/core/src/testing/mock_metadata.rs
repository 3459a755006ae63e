//! Mock metadata provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::provider::{
    FailureCause, MetadataKey, MetadataProvider, MetadataTitle, ProviderFailure,
    ProviderOperation, Region, SortSpec,
};
use crate::record::MediaType;

/// A recorded metadata call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedMetadataCall {
    List { region: Region, page: u32 },
    Search { query: String, page: u32 },
    Detail { key: MetadataKey },
    Sources { tmdb_id: u64, region: Region },
}

/// Mock implementation of the MetadataProvider trait.
///
/// Titles are looked up by id, or by exact title for title keys. Lookups
/// for ids registered with [`fail_title`](Self::fail_title) always fail,
/// which lets a test break enrichment of one item in a page.
#[derive(Debug)]
pub struct MockMetadataProvider {
    /// Titles by metadata id.
    titles: Arc<RwLock<HashMap<u64, MetadataTitle>>>,
    /// Ids whose detail lookup always fails.
    failing: Arc<RwLock<HashSet<u64>>>,
    /// Watch-provider names by metadata id.
    sources: Arc<RwLock<HashMap<u64, Vec<String>>>>,
    /// Artificial latency applied to every detail call.
    detail_delay: Arc<RwLock<Option<Duration>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedMetadataCall>>>,
    /// If set, the next operation will fail with this cause.
    next_error: Arc<RwLock<Option<FailureCause>>>,
}

impl Default for MockMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMetadataProvider {
    /// Create a new empty mock provider.
    pub fn new() -> Self {
        Self {
            titles: Arc::new(RwLock::new(HashMap::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            sources: Arc::new(RwLock::new(HashMap::new())),
            detail_delay: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a title.
    pub async fn add_title(&self, title: MetadataTitle) {
        self.titles.write().await.insert(title.tmdb_id, title);
    }

    /// Make detail lookups for an id fail.
    pub async fn fail_title(&self, tmdb_id: u64) {
        self.failing.write().await.insert(tmdb_id);
    }

    /// Set the watch-provider names returned for an id.
    pub async fn set_sources(&self, tmdb_id: u64, names: Vec<String>) {
        self.sources.write().await.insert(tmdb_id, names);
    }

    /// Delay every detail call, to observe concurrent enrichment.
    pub async fn set_detail_delay(&self, delay: Duration) {
        *self.detail_delay.write().await = Some(delay);
    }

    /// Set an error to be returned on the next operation.
    pub async fn set_next_error(&self, cause: FailureCause) {
        *self.next_error.write().await = Some(cause);
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedMetadataCall> {
        self.calls.read().await.clone()
    }

    /// Number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn record(
        &self,
        operation: ProviderOperation,
        call: RecordedMetadataCall,
    ) -> Result<(), ProviderFailure> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(cause) => Err(ProviderFailure::metadata(operation, cause)),
            None => Ok(()),
        }
    }

    fn not_found(key: &MetadataKey) -> ProviderFailure {
        ProviderFailure::metadata(
            ProviderOperation::Detail,
            FailureCause::NotFound(key.to_string()),
        )
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    async fn list(
        &self,
        region: &Region,
        page: u32,
        _sort: SortSpec,
    ) -> Result<Vec<MetadataTitle>, ProviderFailure> {
        self.record(
            ProviderOperation::List,
            RecordedMetadataCall::List {
                region: region.clone(),
                page,
            },
        )
        .await?;

        if page != 1 {
            return Ok(Vec::new());
        }
        let mut titles: Vec<MetadataTitle> = self.titles.read().await.values().cloned().collect();
        titles.sort_by_key(|t| t.tmdb_id);
        Ok(titles)
    }

    async fn search(
        &self,
        query: &str,
        _region: &Region,
        page: u32,
    ) -> Result<Vec<MetadataTitle>, ProviderFailure> {
        self.record(
            ProviderOperation::Search,
            RecordedMetadataCall::Search {
                query: query.to_string(),
                page,
            },
        )
        .await?;

        let needle = query.to_lowercase();
        let mut titles: Vec<MetadataTitle> = self
            .titles
            .read()
            .await
            .values()
            .filter(|t| {
                t.title
                    .as_deref()
                    .is_some_and(|title| title.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        titles.sort_by_key(|t| t.tmdb_id);
        Ok(titles)
    }

    async fn detail(&self, key: &MetadataKey) -> Result<MetadataTitle, ProviderFailure> {
        self.record(
            ProviderOperation::Detail,
            RecordedMetadataCall::Detail { key: key.clone() },
        )
        .await?;

        let delay = *self.detail_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let titles = self.titles.read().await;
        let found = match key {
            MetadataKey::Id { tmdb_id, .. } => titles.get(tmdb_id),
            MetadataKey::Title { title, .. } => titles
                .values()
                .filter(|t| t.title.as_deref() == Some(title.as_str()))
                .min_by_key(|t| t.tmdb_id),
        }
        .cloned()
        .ok_or_else(|| Self::not_found(key))?;

        if self.failing.read().await.contains(&found.tmdb_id) {
            return Err(ProviderFailure::metadata(
                ProviderOperation::Detail,
                FailureCause::Status {
                    status: 500,
                    message: format!("detail {} failed", found.tmdb_id),
                },
            ));
        }

        Ok(found)
    }

    async fn sources(
        &self,
        tmdb_id: u64,
        _media_type: MediaType,
        region: &Region,
    ) -> Result<Vec<String>, ProviderFailure> {
        self.record(
            ProviderOperation::Sources,
            RecordedMetadataCall::Sources {
                tmdb_id,
                region: region.clone(),
            },
        )
        .await?;

        Ok(self
            .sources
            .read()
            .await
            .get(&tmdb_id)
            .cloned()
            .unwrap_or_default())
    }
}
