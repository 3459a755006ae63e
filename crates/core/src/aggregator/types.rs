//! Page request and result types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::CacheConfig;
use crate::provider::{Region, SortSpec};
use crate::record::{CatalogRecord, TitleId};

/// The kind of listing a page belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PageOperation {
    /// Everything available in the region, provider order.
    ByRegion,
    /// Most popular first.
    Popular,
    /// Most recent releases first.
    NewReleases,
    /// Free-text title search.
    Search {
        #[serde(deserialize_with = "trimmed")]
        query: String,
    },
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|query| query.trim().to_string())
}

impl PageOperation {
    pub fn search(query: impl Into<String>) -> Self {
        PageOperation::Search {
            query: query.into().trim().to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageOperation::ByRegion => "by-region",
            PageOperation::Popular => "popular",
            PageOperation::NewReleases => "new-releases",
            PageOperation::Search { .. } => "search",
        }
    }

    /// Listing sort for non-search operations.
    pub fn sort(&self) -> Option<SortSpec> {
        match self {
            PageOperation::ByRegion => Some(SortSpec::Default),
            PageOperation::Popular => Some(SortSpec::Popularity),
            PageOperation::NewReleases => Some(SortSpec::NewestReleases),
            PageOperation::Search { .. } => None,
        }
    }

    /// Search text with surrounding whitespace removed.
    pub fn query(&self) -> Option<&str> {
        match self {
            PageOperation::Search { query } => Some(query.trim()),
            _ => None,
        }
    }
}

impl fmt::Display for PageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageOperation::Search { query } => write!(f, "search {:?}", query),
            other => f.write_str(other.as_str()),
        }
    }
}

/// One page of one listing in one region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub operation: PageOperation,
    pub region: Region,
    /// 1-indexed page number.
    pub page: u32,
}

impl PageRequest {
    /// Build a request. Page numbers below 1 are clamped to 1.
    pub fn new(operation: PageOperation, region: Region, page: u32) -> Self {
        Self {
            operation,
            region,
            page: page.max(1),
        }
    }

    /// Deterministic cache key: `{operation}:{region}:{query}:{page}`.
    ///
    /// The query is percent-encoded so it can never collide with the
    /// separators.
    pub fn cache_key(&self) -> String {
        let query = self
            .operation
            .query()
            .map(|q| urlencoding::encode(q).into_owned())
            .unwrap_or_default();
        format!(
            "{}:{}:{}:{}",
            self.operation.as_str(),
            self.region,
            query,
            self.page
        )
    }
}

/// Cache key for the platform list of one title in one region.
pub fn sources_key(id: &TitleId, region: &Region) -> String {
    format!("sources:{}:{}", id, region)
}

/// Cache key for the full details of one title.
pub fn details_key(id: &TitleId) -> String {
    format!("details:{}", id)
}

/// Records of one page, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub records: Vec<CatalogRecord>,
}

impl CatalogPage {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Aggregator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// TTL of cached pages, shared by every operation.
    pub page_ttl: Duration,
    /// TTL of cached platform lists and details.
    pub sources_ttl: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            page_ttl: Duration::from_secs(300),
            sources_ttl: Duration::from_secs(600),
        }
    }
}

impl From<&CacheConfig> for AggregatorConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            page_ttl: Duration::from_secs(config.ttl_secs),
            sources_ttl: Duration::from_secs(config.sources_ttl_secs),
        }
    }
}
