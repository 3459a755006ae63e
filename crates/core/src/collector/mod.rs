//! Incremental collection of pages across a browsing session.
//!
//! An [`IncrementalCollector`] owns one session: the query shape being
//! browsed and the records gathered so far. Each [`request_next`] call
//! fetches the next page from a [`PageSource`] and folds it in, keeping
//! records unique by id and preferring the more complete variant.
//!
//! At most one page fetch runs at a time. A call made while another is in
//! flight returns [`FetchOutcome::Skipped`] without touching the source.
//!
//! [`request_next`]: IncrementalCollector::request_next

mod prefetch;
mod state;

pub use prefetch::{should_prefetch, ScrollDirection, ScrollObserver, ScrollPosition};
pub use state::{merge_records, CollectorState};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::{PageOperation, PageRequest, PageSource};
use crate::config::CollectorConfig;
use crate::metrics;
use crate::provider::Region;
use crate::record::{CatalogRecord, TitleId};

/// What a session is browsing: one listing in one region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryShape {
    pub region: Region,
    pub operation: PageOperation,
}

impl QueryShape {
    pub fn new(region: Region, operation: PageOperation) -> Self {
        Self { region, operation }
    }

    pub fn request(&self, page: u32) -> PageRequest {
        PageRequest::new(self.operation.clone(), self.region.clone(), page)
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.operation, self.region)
    }
}

/// Result of one [`IncrementalCollector::request_next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A non-empty page was merged.
    Loaded {
        /// Records on the fetched page.
        received: usize,
        /// Records held after the merge.
        total: usize,
    },
    /// The page was empty; pagination is over for now.
    Empty,
    /// Another fetch was already in flight.
    Skipped,
    /// The session already holds the maximum number of records.
    Exhausted,
    /// The session changed while the page was loading.
    Discarded,
}

impl FetchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOutcome::Loaded { .. } => "loaded",
            FetchOutcome::Empty => "empty",
            FetchOutcome::Skipped => "skipped",
            FetchOutcome::Exhausted => "exhausted",
            FetchOutcome::Discarded => "discarded",
        }
    }
}

struct Session {
    shape: QueryShape,
    state: CollectorState,
    /// Bumped whenever `state` is replaced; fetches started under an older
    /// generation are discarded.
    generation: u64,
    observer: ScrollObserver,
}

impl Session {
    fn replace(&mut self, shape: QueryShape, state: CollectorState) {
        self.shape = shape;
        self.state = state;
        self.generation += 1;
        self.observer.reset();
    }
}

/// Clears the in-flight flag when a fetch ends, however it ends.
struct InFlightGuard<'a> {
    session: &'a Mutex<Session>,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.generation == self.generation {
            session.state.fetch_in_flight = false;
        }
    }
}

/// Session-side page accumulator.
pub struct IncrementalCollector {
    source: Arc<dyn PageSource>,
    config: CollectorConfig,
    session: Mutex<Session>,
}

impl IncrementalCollector {
    pub fn new(source: Arc<dyn PageSource>, shape: QueryShape, config: CollectorConfig) -> Self {
        let observer = ScrollObserver::new(config.prefetch_threshold);
        Self {
            source,
            config,
            session: Mutex::new(Session {
                shape,
                state: CollectorState::new(),
                generation: 0,
                observer,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn shape(&self) -> QueryShape {
        self.lock().shape.clone()
    }

    /// Records gathered so far, in first-seen order.
    pub fn records(&self) -> Vec<CatalogRecord> {
        self.lock().state.records.clone()
    }

    pub fn has_more(&self) -> bool {
        self.lock().state.has_more
    }

    pub fn next_page(&self) -> u32 {
        self.lock().state.next_page
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().state.fetch_in_flight
    }

    /// Switch to another query shape.
    ///
    /// A different shape starts a fresh session; the same shape is a no-op.
    /// Returns whether the session was reset.
    pub fn set_query(&self, shape: QueryShape) -> bool {
        let mut session = self.lock();
        if session.shape == shape {
            return false;
        }
        info!("Query changed from {} to {}, resetting session", session.shape, shape);
        session.replace(shape, CollectorState::new());
        true
    }

    /// Start the current query over from page 1.
    pub fn reset(&self) {
        let mut session = self.lock();
        let shape = session.shape.clone();
        session.replace(shape, CollectorState::new());
    }

    /// Copy of the current state, for persistence.
    pub fn snapshot(&self) -> CollectorState {
        self.lock().state.clone()
    }

    /// Replace the current state with a saved one.
    ///
    /// A saved in-flight flag is cleared: the fetch it referred to belongs
    /// to another session. Records beyond the cap are dropped.
    pub fn restore(&self, mut state: CollectorState) {
        state.fetch_in_flight = false;
        if state.records.len() > self.config.max_records {
            state.records.truncate(self.config.max_records);
            state.has_more = false;
        }
        let mut session = self.lock();
        let shape = session.shape.clone();
        session.replace(shape, state);
    }

    /// Fetch the next page and fold it into the session.
    pub async fn request_next(&self) -> FetchOutcome {
        let outcome = self.fetch_next().await;
        metrics::COLLECTOR_FETCHES
            .with_label_values(&[outcome.as_str()])
            .inc();
        outcome
    }

    async fn fetch_next(&self) -> FetchOutcome {
        let (request, generation) = {
            let mut session = self.lock();
            if session.state.fetch_in_flight {
                return FetchOutcome::Skipped;
            }
            if session.state.len() >= self.config.max_records {
                return FetchOutcome::Exhausted;
            }
            session.state.fetch_in_flight = true;
            (
                session.shape.request(session.state.next_page),
                session.generation,
            )
        };
        let _guard = InFlightGuard {
            session: &self.session,
            generation,
        };

        debug!(
            "Requesting page {} of {} in {}",
            request.page, request.operation, request.region
        );
        let page = self.source.fetch_page(&request).await;

        let mut session = self.lock();
        if session.generation != generation {
            debug!("Discarding page {} fetched for a replaced session", request.page);
            return FetchOutcome::Discarded;
        }

        let received = session
            .state
            .apply_page(page.records, self.config.max_records);
        session.state.fetch_in_flight = false;

        if received == 0 {
            info!(
                "Page {} of {} was empty, {} records collected",
                request.page,
                session.shape,
                session.state.len()
            );
            FetchOutcome::Empty
        } else {
            FetchOutcome::Loaded {
                received,
                total: session.state.len(),
            }
        }
    }

    /// Feed a scroll position to the prefetch observer.
    ///
    /// Returns whether the caller should request the next page now.
    pub fn observe_scroll(&self, position: ScrollPosition) -> bool {
        let mut session = self.lock();
        let Session {
            state, observer, ..
        } = &mut *session;
        observer.observe(position, state)
    }

    /// Feed a scroll position and prefetch when it calls for it.
    pub async fn on_scroll(&self, position: ScrollPosition) -> Option<FetchOutcome> {
        if self.observe_scroll(position) {
            Some(self.request_next().await)
        } else {
            None
        }
    }

    /// Load the platform list of a collected record.
    ///
    /// Returns `None` when the record is not in the session. A record that
    /// already has platforms is answered without a fetch. An empty result
    /// is returned but not attached, so a later call can try again.
    pub async fn load_platforms(&self, id: &TitleId) -> Option<Vec<String>> {
        let (region, generation) = {
            let session = self.lock();
            let record = session.state.record(id)?;
            if let Some(platforms) = &record.platforms {
                return Some(platforms.clone());
            }
            (session.shape.region.clone(), session.generation)
        };

        let platforms = self.source.fetch_platforms(id, &region).await;

        if !platforms.is_empty() {
            let mut session = self.lock();
            if session.generation == generation {
                session.state.attach_platforms(id, platforms.clone());
            }
        }

        Some(platforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::completeness;
    use crate::testing::{fixtures, MockPageSource};

    fn us() -> Region {
        Region::parse("US").unwrap()
    }

    fn shape() -> QueryShape {
        QueryShape::new(us(), PageOperation::ByRegion)
    }

    fn config(max_records: usize) -> CollectorConfig {
        CollectorConfig {
            max_records,
            ..CollectorConfig::default()
        }
    }

    fn collector(source: &Arc<MockPageSource>, max_records: usize) -> IncrementalCollector {
        IncrementalCollector::new(source.clone(), shape(), config(max_records))
    }

    #[tokio::test]
    async fn test_request_next_loads_pages_in_order() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 3)).await;
        source.set_page(shape().request(2), fixtures::records(4, 3)).await;
        let collector = collector(&source, 102);

        assert_eq!(
            collector.request_next().await,
            FetchOutcome::Loaded {
                received: 3,
                total: 3
            }
        );
        assert_eq!(
            collector.request_next().await,
            FetchOutcome::Loaded {
                received: 3,
                total: 6
            }
        );
        assert_eq!(collector.next_page(), 3);
        assert!(collector.has_more());
        assert!(!collector.is_fetching());

        let pages: Vec<u32> = source.requests().await.iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_page_retried_on_next_call() {
        let source = Arc::new(MockPageSource::new());
        let collector = collector(&source, 102);

        assert_eq!(collector.request_next().await, FetchOutcome::Empty);
        assert!(!collector.has_more());
        assert_eq!(collector.next_page(), 1);

        source.set_page(shape().request(1), fixtures::records(1, 2)).await;
        assert!(matches!(
            collector.request_next().await,
            FetchOutcome::Loaded { received: 2, .. }
        ));
        assert!(collector.has_more());
    }

    #[tokio::test]
    async fn test_exhausted_at_cap_without_fetch() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 5)).await;
        let collector = collector(&source, 5);

        collector.request_next().await;
        assert!(!collector.has_more());
        assert_eq!(collector.request_next().await, FetchOutcome::Exhausted);
        assert_eq!(source.request_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_request_is_skipped() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 3)).await;
        source.pause().await;
        let collector = Arc::new(collector(&source, 102));

        let first = tokio::spawn({
            let collector = collector.clone();
            async move { collector.request_next().await }
        });
        source.wait_for_requests(1).await;
        assert!(collector.is_fetching());

        assert_eq!(collector.request_next().await, FetchOutcome::Skipped);
        assert_eq!(source.request_count().await, 1);

        source.release(1).await;
        assert!(matches!(
            first.await.unwrap(),
            FetchOutcome::Loaded { received: 3, .. }
        ));
        assert!(!collector.is_fetching());
    }

    #[tokio::test]
    async fn test_dropped_fetch_clears_in_flight() {
        let source = Arc::new(MockPageSource::new());
        source.pause().await;
        let collector = Arc::new(collector(&source, 102));

        let pending = tokio::spawn({
            let collector = collector.clone();
            async move { collector.request_next().await }
        });
        source.wait_for_requests(1).await;
        assert!(collector.is_fetching());

        pending.abort();
        let _ = pending.await;

        assert!(!collector.is_fetching());
        assert_eq!(collector.next_page(), 1);
    }

    #[tokio::test]
    async fn test_query_change_discards_stale_page() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 3)).await;
        source.pause().await;
        let collector = Arc::new(collector(&source, 102));

        let stale = tokio::spawn({
            let collector = collector.clone();
            async move { collector.request_next().await }
        });
        source.wait_for_requests(1).await;

        let gb = QueryShape::new(Region::parse("GB").unwrap(), PageOperation::ByRegion);
        assert!(collector.set_query(gb));
        assert!(!collector.is_fetching());

        source.release(1).await;
        assert_eq!(stale.await.unwrap(), FetchOutcome::Discarded);
        assert!(collector.records().is_empty());
        assert_eq!(collector.next_page(), 1);
    }

    #[tokio::test]
    async fn test_same_query_keeps_session() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 3)).await;
        let collector = collector(&source, 102);
        collector.request_next().await;

        assert!(!collector.set_query(shape()));
        assert_eq!(collector.records().len(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 3)).await;
        source.set_page(shape().request(2), fixtures::records(4, 2)).await;
        let collector = collector(&source, 102);
        collector.request_next().await;

        let mut saved = collector.snapshot();
        collector.reset();
        assert!(collector.records().is_empty());

        saved.fetch_in_flight = true;
        collector.restore(saved);
        assert!(!collector.is_fetching());
        assert_eq!(collector.records().len(), 3);

        collector.request_next().await;
        assert_eq!(collector.records().len(), 5);
        assert_eq!(source.requests().await.last().unwrap().page, 2);
    }

    #[tokio::test]
    async fn test_restore_truncates_to_cap() {
        let source = Arc::new(MockPageSource::new());
        let collector = collector(&source, 4);
        let state = CollectorState {
            records: fixtures::records(1, 10),
            next_page: 3,
            has_more: true,
            fetch_in_flight: false,
        };

        collector.restore(state);
        assert_eq!(collector.records().len(), 4);
        assert!(!collector.has_more());
    }

    #[tokio::test]
    async fn test_load_platforms_attaches_once() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 1)).await;
        let id = TitleId::from(1u64);
        source
            .set_platforms(&id, vec!["Netflix".to_string()])
            .await;
        let collector = collector(&source, 102);
        collector.request_next().await;
        let before = completeness(&collector.records()[0]);

        assert_eq!(
            collector.load_platforms(&id).await,
            Some(vec!["Netflix".to_string()])
        );
        assert_eq!(completeness(&collector.records()[0]), before + 1);

        collector.load_platforms(&id).await;
        assert_eq!(source.platform_requests().await.len(), 1);
        assert_eq!(source.platform_requests().await[0].1, us());
    }

    #[tokio::test]
    async fn test_load_platforms_unknown_or_empty() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 1)).await;
        let collector = collector(&source, 102);
        collector.request_next().await;

        assert_eq!(collector.load_platforms(&TitleId::from(99u64)).await, None);

        let id = TitleId::from(1u64);
        assert_eq!(collector.load_platforms(&id).await, Some(vec![]));
        assert_eq!(collector.records()[0].platforms, None);
    }

    #[tokio::test]
    async fn test_on_scroll_prefetches_once() {
        let source = Arc::new(MockPageSource::new());
        source.set_page(shape().request(1), fixtures::records(1, 3)).await;
        source.set_page(shape().request(2), fixtures::records(4, 3)).await;
        let collector = collector(&source, 102);
        collector.request_next().await;

        assert_eq!(
            collector
                .on_scroll(ScrollPosition::new(0.0, 300.0, 3000.0))
                .await,
            None
        );
        assert!(matches!(
            collector
                .on_scroll(ScrollPosition::new(800.0, 300.0, 3000.0))
                .await,
            Some(FetchOutcome::Loaded { .. })
        ));
        assert_eq!(
            collector
                .on_scroll(ScrollPosition::new(900.0, 300.0, 3000.0))
                .await,
            None
        );
        assert_eq!(source.request_count().await, 2);
    }

    #[tokio::test]
    async fn test_no_prefetch_after_empty_page() {
        let source = Arc::new(MockPageSource::new());
        let collector = collector(&source, 102);
        collector.request_next().await;

        collector.observe_scroll(ScrollPosition::new(0.0, 300.0, 3000.0));
        assert!(!collector.observe_scroll(ScrollPosition::new(2000.0, 300.0, 3000.0)));
    }
}
