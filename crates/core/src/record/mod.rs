//! Normalized catalog records.
//!
//! A [`CatalogRecord`] is the unit every other component exchanges: the
//! aggregator produces them, the cache stores them and the collector
//! accumulates them across pages.

mod merge;

pub use merge::{merge, ImageTemplates};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Title used when neither provider supplies one.
pub const UNTITLED: &str = "Untitled";

/// Display fallback for records without an overview.
///
/// The record itself keeps `overview: None`; renderers substitute this.
pub const OVERVIEW_PLACEHOLDER: &str = "No description available.";

/// Stable identity of a title, assigned by the availability provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(String);

impl TitleId {
    /// Create an id from its provider representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for TitleId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TitleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TitleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Series,
    #[default]
    Other,
}

impl MediaType {
    /// Map an availability-provider type string (`movie`, `tv_series`, ...).
    pub fn from_availability_type(kind: &str) -> Self {
        match kind {
            "movie" | "tv_movie" | "short_film" => MediaType::Movie,
            "tv_series" | "tv_miniseries" | "tv_special" => MediaType::Series,
            _ => MediaType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
            MediaType::Other => "other",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A title merged from the availability and metadata providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Availability-provider identity. Never changes once assigned.
    pub id: TitleId,
    pub title: String,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,
    /// Streaming platforms in the session's region. `None` until loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
}

impl CatalogRecord {
    /// Create a record with only the identity fields set.
    pub fn new(id: impl Into<TitleId>, title: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            media_type,
            year: None,
            poster_url: None,
            backdrop_url: None,
            overview: None,
            genres: Vec::new(),
            rating: None,
            runtime_minutes: None,
            runtime_display: None,
            trailer_url: None,
            platforms: None,
        }
    }

    /// Whether the record has at least one image to show.
    pub fn has_image(&self) -> bool {
        self.poster_url.is_some() || self.backdrop_url.is_some()
    }

    pub fn overview_or_placeholder(&self) -> &str {
        self.overview.as_deref().unwrap_or(OVERVIEW_PLACEHOLDER)
    }

    /// Set the runtime and keep the derived display string in sync.
    pub fn set_runtime(&mut self, minutes: Option<u32>) {
        self.runtime_minutes = minutes;
        self.runtime_display = runtime_display(minutes);
    }
}

/// Number of populated nullable fields on a record.
///
/// Identity fields (`id`, `title`, `media_type`) are always present and do
/// not count. Empty `genres` counts as absent.
pub fn completeness(record: &CatalogRecord) -> usize {
    [
        record.year.is_some(),
        record.poster_url.is_some(),
        record.backdrop_url.is_some(),
        record.overview.is_some(),
        !record.genres.is_empty(),
        record.rating.is_some(),
        record.runtime_minutes.is_some(),
        record.runtime_display.is_some(),
        record.trailer_url.is_some(),
        record.platforms.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count()
}

/// Format a runtime as `"2h 5m"` or `"45m"`.
pub fn runtime_display(minutes: Option<u32>) -> Option<String> {
    let minutes = minutes?;
    if minutes >= 60 {
        Some(format!("{}h {}m", minutes / 60, minutes % 60))
    } else {
        Some(format!("{}m", minutes))
    }
}
