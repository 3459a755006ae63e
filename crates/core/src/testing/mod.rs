//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the provider and page-source
//! traits, allowing the aggregator and collector to be exercised without
//! network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use streamdex_core::testing::{fixtures, MockAvailabilityProvider, MockMetadataProvider};
//!
//! let availability = MockAvailabilityProvider::new();
//! let metadata = MockMetadataProvider::new();
//!
//! // Configure mock responses
//! availability.set_listing(1, vec![fixtures::listing_with_poster(1, "Heat")]).await;
//! metadata.fail_title(949).await;
//!
//! // Wire into a PageAggregator...
//! ```

mod mock_availability;
mod mock_cache;
mod mock_metadata;
mod mock_page_source;

pub use mock_availability::{MockAvailabilityProvider, RecordedAvailabilityCall};
pub use mock_cache::FailingCache;
pub use mock_metadata::{MockMetadataProvider, RecordedMetadataCall};
pub use mock_page_source::MockPageSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::provider::{AvailabilityTitle, MetadataTitle};
    use crate::record::{CatalogRecord, MediaType};

    /// Create a listing item with identity fields only.
    pub fn listing(id: u64, title: &str) -> AvailabilityTitle {
        let mut item = AvailabilityTitle::new(id, title);
        item.kind = Some("movie".to_string());
        item
    }

    /// Create a listing item that carries its own poster.
    pub fn listing_with_poster(id: u64, title: &str) -> AvailabilityTitle {
        let mut item = listing(id, title);
        item.poster_url = Some(format!("https://cdn.example/posters/{}.jpg", id));
        item
    }

    /// Create a listing item cross-referenced to a metadata id.
    pub fn linked_listing(id: u64, title: &str, tmdb_id: u64) -> AvailabilityTitle {
        let mut item = listing_with_poster(id, title);
        item.tmdb_id = Some(tmdb_id);
        item.tmdb_type = Some("movie".to_string());
        item
    }

    /// Create a fully populated metadata title.
    pub fn metadata_title(tmdb_id: u64, title: &str) -> MetadataTitle {
        MetadataTitle {
            tmdb_id,
            media_type: MediaType::Movie,
            title: Some(title.to_string()),
            overview: Some(format!("{} overview", title)),
            poster_path: Some(format!("/{}.jpg", tmdb_id)),
            backdrop_path: Some(format!("/{}-backdrop.jpg", tmdb_id)),
            release_date: Some("2015-06-01".to_string()),
            runtime_minutes: Some(118),
            episode_runtimes: vec![],
            genres: vec!["Drama".to_string()],
            vote_average: Some(7.6),
            trailer_url: Some(format!("https://www.youtube.com/watch?v=t{}", tmdb_id)),
        }
    }

    /// Create a record with a poster and nothing else (completeness 1).
    pub fn record(id: u64, title: &str) -> CatalogRecord {
        let mut record = CatalogRecord::new(id, title, MediaType::Movie);
        record.poster_url = Some(format!("https://cdn.example/posters/{}.jpg", id));
        record
    }

    /// Create a record with a poster plus `extra` more populated fields.
    ///
    /// Fields are filled in a fixed order (overview, year, backdrop, rating,
    /// genres, trailer), so completeness is `1 + extra` for `extra <= 6`.
    pub fn record_with_fields(id: u64, title: &str, extra: usize) -> CatalogRecord {
        let mut record = record(id, title);
        if extra > 0 {
            record.overview = Some(format!("{} overview", title));
        }
        if extra > 1 {
            record.year = Some(2001);
        }
        if extra > 2 {
            record.backdrop_url = Some(format!("https://cdn.example/backdrops/{}.jpg", id));
        }
        if extra > 3 {
            record.rating = Some(7.1);
        }
        if extra > 4 {
            record.genres = vec!["Drama".to_string()];
        }
        if extra > 5 {
            record.trailer_url = Some("https://www.youtube.com/watch?v=x".to_string());
        }
        record
    }

    /// Create `count` poster-only records with ids `start..start + count`.
    pub fn records(start: u64, count: usize) -> Vec<CatalogRecord> {
        (start..start + count as u64)
            .map(|id| record(id, &format!("Title {}", id)))
            .collect()
    }
}
