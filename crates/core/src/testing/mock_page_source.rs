//! Mock page source for collector tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

use crate::aggregator::{CatalogPage, PageRequest, PageSource};
use crate::provider::Region;
use crate::record::{CatalogRecord, TitleId};

/// Mock implementation of the PageSource trait.
///
/// Pages are served from a table keyed by request; unknown requests get an
/// empty page. [`pause`](Self::pause) holds every fetch until
/// [`release`](Self::release) lets them through, so tests can observe a
/// fetch while it is in flight.
#[derive(Debug)]
pub struct MockPageSource {
    pages: Arc<RwLock<HashMap<PageRequest, Vec<CatalogRecord>>>>,
    platforms: Arc<RwLock<HashMap<TitleId, Vec<String>>>>,
    requests: Arc<RwLock<Vec<PageRequest>>>,
    platform_requests: Arc<RwLock<Vec<(TitleId, Region)>>>,
    gate: Arc<RwLock<Option<Arc<Semaphore>>>>,
}

impl Default for MockPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageSource {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(RwLock::new(HashMap::new())),
            platforms: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            platform_requests: Arc::new(RwLock::new(Vec::new())),
            gate: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the records served for a request.
    pub async fn set_page(&self, request: PageRequest, records: Vec<CatalogRecord>) {
        self.pages.write().await.insert(request, records);
    }

    /// Set the platforms served for a title (any region).
    pub async fn set_platforms(&self, id: &TitleId, names: Vec<String>) {
        self.platforms.write().await.insert(id.clone(), names);
    }

    /// Hold subsequent fetches until released.
    pub async fn pause(&self) {
        *self.gate.write().await = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held fetches complete.
    pub async fn release(&self, count: usize) {
        if let Some(gate) = self.gate.read().await.as_ref() {
            gate.add_permits(count);
        }
    }

    /// Page requests received so far, in order.
    pub async fn requests(&self) -> Vec<PageRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Platform requests received so far, in order.
    pub async fn platform_requests(&self) -> Vec<(TitleId, Region)> {
        self.platform_requests.read().await.clone()
    }

    /// Wait until at least `count` page requests have been received.
    pub async fn wait_for_requests(&self, count: usize) {
        while self.request_count().await < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn fetch_page(&self, request: &PageRequest) -> CatalogPage {
        self.requests.write().await.push(request.clone());

        let gate = self.gate.read().await.clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let records = self
            .pages
            .read()
            .await
            .get(request)
            .cloned()
            .unwrap_or_default();
        CatalogPage::new(records)
    }

    async fn fetch_platforms(&self, id: &TitleId, region: &Region) -> Vec<String> {
        self.platform_requests
            .write()
            .await
            .push((id.clone(), region.clone()));
        self.platforms
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }
}
