//! Provider-native payload types.

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{MediaType, TitleId};

static REGION_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2}$").unwrap());

/// Rejected region code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid region code: {0:?} (expected two letters)")]
pub struct InvalidRegion(pub String);

/// Two-letter region code, stored uppercase.
///
/// The engine treats regions as opaque keys; only the shape is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    pub fn parse(code: &str) -> Result<Self, InvalidRegion> {
        let code = code.trim();
        if REGION_CODE.is_match(code) {
            Ok(Self(code.to_uppercase()))
        } else {
            Err(InvalidRegion(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self("US".to_string())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Region {
    type Error = InvalidRegion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Region::parse(&value)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.0
    }
}

/// Ordering requested from a listing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortSpec {
    /// Provider default ordering.
    #[default]
    Default,
    /// Most popular first.
    Popularity,
    /// Most recently released first.
    NewestReleases,
}

/// One title as reported by the availability provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityTitle {
    /// Availability-provider id.
    pub id: TitleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Raw type string (`movie`, `tv_series`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Cross-reference into the metadata provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    /// Metadata-provider type of the cross-reference (`movie` or `tv`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,
}

impl AvailabilityTitle {
    /// Listing-level title with only identity fields.
    pub fn new(id: impl Into<TitleId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            kind: None,
            year: None,
            tmdb_id: None,
            tmdb_type: None,
            poster_url: None,
            backdrop_url: None,
            synopsis: None,
            runtime_minutes: None,
            user_rating: None,
            trailer_url: None,
        }
    }

    pub fn media_type(&self) -> Option<MediaType> {
        self.kind.as_deref().map(MediaType::from_availability_type)
    }

    /// Key used to enrich this title from the metadata provider.
    ///
    /// Prefers the cross-reference id; falls back to title + type. Returns
    /// `None` when neither is known.
    pub fn metadata_key(&self) -> Option<MetadataKey> {
        let media_type = match self.tmdb_type.as_deref() {
            Some("tv") => MediaType::Series,
            Some("movie") => MediaType::Movie,
            _ => self.media_type().unwrap_or(MediaType::Movie),
        };

        if let Some(tmdb_id) = self.tmdb_id.filter(|id| *id > 0) {
            return Some(MetadataKey::Id {
                tmdb_id,
                media_type,
            });
        }

        self.title
            .as_ref()
            .filter(|t| !t.trim().is_empty())
            .map(|title| MetadataKey::Title {
                title: title.clone(),
                media_type,
            })
    }
}

/// How to look a title up in the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    /// Direct lookup by metadata-provider id.
    Id { tmdb_id: u64, media_type: MediaType },
    /// Search by title, then look up the first hit.
    Title { title: String, media_type: MediaType },
}

impl MetadataKey {
    pub fn media_type(&self) -> MediaType {
        match self {
            MetadataKey::Id { media_type, .. } | MetadataKey::Title { media_type, .. } => {
                *media_type
            }
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataKey::Id {
                tmdb_id,
                media_type,
            } => write!(f, "{}/{}", media_type, tmdb_id),
            MetadataKey::Title { title, media_type } => write!(f, "{} {:?}", media_type, title),
        }
    }
}

/// Descriptive metadata for one title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataTitle {
    /// Metadata-provider id.
    pub tmdb_id: u64,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    /// Poster path (relative to the image base URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    /// Backdrop path (relative to the image base URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    /// Release date for movies, first air date for series (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    /// Typical episode runtimes for series.
    #[serde(default)]
    pub episode_runtimes: Vec<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Average vote (0-10).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer_url: Option<String>,
}

impl MetadataTitle {
    /// Get the release year from the release date.
    pub fn year(&self) -> Option<u32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}
