//! Field-by-field merge of provider payloads into a [`CatalogRecord`].

use super::{runtime_display, CatalogRecord, MediaType, UNTITLED};
use crate::provider::{AvailabilityTitle, MetadataTitle};

/// Size templates for metadata-provider image paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTemplates {
    pub poster_prefix: &'static str,
    pub backdrop_prefix: &'static str,
}

impl ImageTemplates {
    pub const TMDB: ImageTemplates = ImageTemplates {
        poster_prefix: "https://image.tmdb.org/t/p/w500",
        backdrop_prefix: "https://image.tmdb.org/t/p/original",
    };

    pub fn poster(&self, path: &str) -> String {
        format!("{}{}", self.poster_prefix, path)
    }

    pub fn backdrop(&self, path: &str) -> String {
        format!("{}{}", self.backdrop_prefix, path)
    }
}

impl Default for ImageTemplates {
    fn default() -> Self {
        Self::TMDB
    }
}

/// Combine an availability item with optional metadata.
///
/// Each field is resolved on its own, so a record can take its title from
/// one provider and its poster from the other. The merge never drops a
/// record; filtering image-less results is left to the caller.
pub fn merge(availability: &AvailabilityTitle, metadata: Option<&MetadataTitle>) -> CatalogRecord {
    let images = ImageTemplates::TMDB;

    let title = availability
        .title
        .clone()
        .or_else(|| metadata.and_then(|m| m.title.clone()))
        .unwrap_or_else(|| UNTITLED.to_string());

    let media_type = availability
        .media_type()
        .or_else(|| metadata.map(|m| m.media_type))
        .unwrap_or(MediaType::Other);

    let poster_url = availability.poster_url.clone().or_else(|| {
        metadata
            .and_then(|m| m.poster_path.as_deref())
            .map(|p| images.poster(p))
    });

    let backdrop_url = availability.backdrop_url.clone().or_else(|| {
        metadata
            .and_then(|m| m.backdrop_path.as_deref())
            .map(|p| images.backdrop(p))
    });

    let overview = availability
        .synopsis
        .clone()
        .or_else(|| metadata.and_then(|m| m.overview.clone()));

    let runtime_minutes = metadata
        .and_then(|m| m.runtime_minutes.filter(|r| *r > 0))
        .or_else(|| {
            metadata
                .and_then(|m| m.episode_runtimes.first().copied())
                .filter(|r| *r > 0)
        })
        .or_else(|| availability.runtime_minutes.filter(|r| *r > 0));

    let year = availability.year.or_else(|| metadata.and_then(|m| m.year()));

    let genres = metadata.map(|m| m.genres.clone()).unwrap_or_default();

    let rating = metadata
        .and_then(|m| m.vote_average.filter(|v| *v > 0.0))
        .or(availability.user_rating);

    let trailer_url = metadata
        .and_then(|m| m.trailer_url.clone())
        .or_else(|| availability.trailer_url.clone());

    CatalogRecord {
        id: availability.id.clone(),
        title,
        media_type,
        year,
        poster_url,
        backdrop_url,
        overview,
        genres,
        rating,
        runtime_minutes,
        runtime_display: runtime_display(runtime_minutes),
        trailer_url,
        platforms: None,
    }
}
