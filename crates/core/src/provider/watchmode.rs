//! Watchmode API client (availability provider).
//!
//! The API key travels as the `apiKey` query parameter on every request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{AvailabilityTitle, Region, SortSpec};
use super::{
    ensure_success, unique_names, AvailabilityProvider, FailureCause, ProviderFailure,
    ProviderOperation,
};
use crate::record::TitleId;

const DEFAULT_BASE_URL: &str = "https://api.watchmode.com/v1";

/// Title types requested when listing new releases.
const RELEASE_TITLE_TYPES: &str = "movie,tv_series,tv_movie,tv_special,tv_miniseries,short_film";

/// Watchmode client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchmodeConfig {
    /// Watchmode API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.watchmode.com/v1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Titles requested per page (default: 15).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_page_size() -> u32 {
    15
}

fn default_timeout() -> u32 {
    30
}

/// Watchmode API client.
pub struct WatchmodeClient {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl WatchmodeClient {
    /// Create a new Watchmode client.
    pub fn new(config: WatchmodeConfig) -> Result<Self, FailureCause> {
        if config.api_key.is_empty() {
            return Err(FailureCause::NotConfigured(
                "Watchmode API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            page_size: config.page_size,
        })
    }

    async fn list_titles(
        &self,
        region: &Region,
        page: u32,
        sort: SortSpec,
    ) -> Result<Vec<AvailabilityTitle>, FailureCause> {
        let url = format!("{}/list-titles/", self.base_url);
        let page = page.to_string();
        let limit = self.page_size.to_string();

        debug!(
            "Watchmode list titles: region={}, page={}, sort={:?}",
            region, page, sort
        );

        let mut request = self.client.get(&url).query(&[
            ("apiKey", self.api_key.as_str()),
            ("regions", region.as_str()),
            ("limit", limit.as_str()),
            ("page", page.as_str()),
        ]);

        match sort {
            SortSpec::Default => {}
            SortSpec::Popularity => request = request.query(&[("sort_by", "popularity_desc")]),
            SortSpec::NewestReleases => {
                request = request.query(&[
                    ("sort_by", "release_date_desc"),
                    ("title_types", RELEASE_TITLE_TYPES),
                ])
            }
        }

        let response = ensure_success(request.send().await?, || "list-titles".to_string()).await?;

        let list: WatchmodeListResponse = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse list-titles response: {}", e))
        })?;

        let titles = list.titles.ok_or_else(|| {
            FailureCause::Malformed("list-titles response has no titles array".to_string())
        })?;

        Ok(titles.into_iter().map(|t| t.into()).collect())
    }

    async fn search_titles(
        &self,
        query: &str,
        region: &Region,
        page: u32,
    ) -> Result<Vec<AvailabilityTitle>, FailureCause> {
        let url = format!("{}/search/", self.base_url);
        let page = page.to_string();
        let limit = self.page_size.to_string();

        debug!("Watchmode search: query='{}', region={}", query, region);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("search_field", "name"),
                ("search_value", query),
                ("fuzzy_search", "true"),
                ("regions", region.as_str()),
                ("page", page.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let response = ensure_success(response, || format!("search {:?}", query)).await?;

        let search: WatchmodeSearchResponse = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse search response: {}", e))
        })?;

        let results = search.title_results.ok_or_else(|| {
            FailureCause::Malformed("search response has no title_results array".to_string())
        })?;

        Ok(results.into_iter().map(|r| r.into()).collect())
    }

    async fn title_details(&self, id: &TitleId) -> Result<AvailabilityTitle, FailureCause> {
        let url = format!("{}/title/{}/details/", self.base_url, id);

        debug!("Watchmode get details: id={}", id);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let response = ensure_success(response, || format!("Title ID {}", id)).await?;

        let details: WatchmodeDetails = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse details response: {}", e))
        })?;

        Ok(details.into())
    }

    async fn title_sources(
        &self,
        id: &TitleId,
        region: &Region,
    ) -> Result<Vec<String>, FailureCause> {
        let url = format!("{}/title/{}/sources/", self.base_url, id);

        debug!("Watchmode get sources: id={}, region={}", id, region);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", region.as_str()),
            ])
            .send()
            .await?;

        let response = ensure_success(response, || format!("Title ID {}", id)).await?;

        let sources: Vec<WatchmodeSource> = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse sources response: {}", e))
        })?;

        Ok(unique_names(sources.into_iter().filter_map(|s| s.name)))
    }
}

#[async_trait]
impl AvailabilityProvider for WatchmodeClient {
    async fn list(
        &self,
        region: &Region,
        page: u32,
        sort: SortSpec,
    ) -> Result<Vec<AvailabilityTitle>, ProviderFailure> {
        self.list_titles(region, page, sort)
            .await
            .map_err(|cause| ProviderFailure::availability(ProviderOperation::List, cause))
    }

    async fn search(
        &self,
        query: &str,
        region: &Region,
        page: u32,
    ) -> Result<Vec<AvailabilityTitle>, ProviderFailure> {
        self.search_titles(query, region, page)
            .await
            .map_err(|cause| ProviderFailure::availability(ProviderOperation::Search, cause))
    }

    async fn detail(&self, id: &TitleId) -> Result<AvailabilityTitle, ProviderFailure> {
        self.title_details(id)
            .await
            .map_err(|cause| ProviderFailure::availability(ProviderOperation::Detail, cause))
    }

    async fn sources(
        &self,
        id: &TitleId,
        region: &Region,
    ) -> Result<Vec<String>, ProviderFailure> {
        self.title_sources(id, region)
            .await
            .map_err(|cause| ProviderFailure::availability(ProviderOperation::Sources, cause))
    }
}

// ============================================================================
// Watchmode API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct WatchmodeListResponse {
    titles: Option<Vec<WatchmodeListTitle>>,
}

#[derive(Debug, Deserialize)]
struct WatchmodeListTitle {
    id: u64,
    title: Option<String>,
    year: Option<u32>,
    tmdb_id: Option<u64>,
    tmdb_type: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchmodeSearchResponse {
    title_results: Option<Vec<WatchmodeSearchResult>>,
}

#[derive(Debug, Deserialize)]
struct WatchmodeSearchResult {
    id: u64,
    name: Option<String>,
    year: Option<u32>,
    tmdb_id: Option<u64>,
    tmdb_type: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchmodeDetails {
    id: u64,
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    year: Option<u32>,
    tmdb_id: Option<u64>,
    tmdb_type: Option<String>,
    plot_overview: Option<String>,
    runtime_minutes: Option<u32>,
    user_rating: Option<f32>,
    poster: Option<String>,
    backdrop: Option<String>,
    trailer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchmodeSource {
    name: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<WatchmodeListTitle> for AvailabilityTitle {
    fn from(t: WatchmodeListTitle) -> Self {
        Self {
            id: TitleId::from(t.id),
            title: non_empty(t.title),
            kind: t.kind,
            year: t.year,
            tmdb_id: t.tmdb_id,
            tmdb_type: t.tmdb_type,
            poster_url: None, // Listing payload carries no images
            backdrop_url: None,
            synopsis: None,
            runtime_minutes: None,
            user_rating: None,
            trailer_url: None,
        }
    }
}

impl From<WatchmodeSearchResult> for AvailabilityTitle {
    fn from(r: WatchmodeSearchResult) -> Self {
        Self {
            id: TitleId::from(r.id),
            title: non_empty(r.name),
            kind: r.kind,
            year: r.year,
            tmdb_id: r.tmdb_id,
            tmdb_type: r.tmdb_type,
            poster_url: None,
            backdrop_url: None,
            synopsis: None,
            runtime_minutes: None,
            user_rating: None,
            trailer_url: None,
        }
    }
}

impl From<WatchmodeDetails> for AvailabilityTitle {
    fn from(d: WatchmodeDetails) -> Self {
        Self {
            id: TitleId::from(d.id),
            title: non_empty(d.title),
            kind: d.kind,
            year: d.year,
            tmdb_id: d.tmdb_id,
            tmdb_type: d.tmdb_type,
            poster_url: non_empty(d.poster),
            backdrop_url: non_empty(d.backdrop),
            synopsis: non_empty(d.plot_overview),
            runtime_minutes: d.runtime_minutes,
            user_rating: d.user_rating,
            trailer_url: non_empty(d.trailer),
        }
    }
}
