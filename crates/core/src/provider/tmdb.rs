//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{MetadataKey, MetadataTitle, Region, SortSpec};
use super::{
    ensure_success, unique_names, FailureCause, MetadataProvider, ProviderFailure,
    ProviderOperation,
};
use crate::record::MediaType;

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_LANGUAGE: &str = "en-US";

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Response language (default: en-US).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, FailureCause> {
        if config.api_key.is_empty() {
            return Err(FailureCause::NotConfigured(
                "TMDB API key is required".to_string(),
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
            language: config
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        })
    }

    async fn get_details(
        &self,
        tmdb_id: u64,
        media_type: MediaType,
    ) -> Result<MetadataTitle, FailureCause> {
        let url = format!("{}/{}/{}", self.base_url, path_segment(media_type), tmdb_id);

        debug!("TMDB get details: type={}, id={}", media_type, tmdb_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "videos"),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        let response =
            ensure_success(response, || format!("{} ID {}", media_type, tmdb_id)).await?;

        let details: TmdbDetails = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse details response: {}", e))
        })?;

        Ok(details.into_metadata(media_type))
    }

    async fn search_first(
        &self,
        title: &str,
        media_type: MediaType,
    ) -> Result<u64, FailureCause> {
        let url = format!("{}/search/{}", self.base_url, path_segment(media_type));

        debug!("TMDB title search: query='{}', type={}", title, media_type);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", title),
                ("include_adult", "false"),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        let response = ensure_success(response, || format!("search {:?}", title)).await?;

        let search_result: TmdbSearchResponse<TmdbListResult> =
            response.json().await.map_err(|e| {
                FailureCause::Malformed(format!("Failed to parse search response: {}", e))
            })?;

        search_result
            .results
            .first()
            .map(|r| r.id)
            .ok_or_else(|| FailureCause::NotFound(format!("No {} matching {:?}", media_type, title)))
    }

    async fn discover(
        &self,
        region: &Region,
        page: u32,
        sort: SortSpec,
    ) -> Result<Vec<MetadataTitle>, FailureCause> {
        let url = format!("{}/discover/movie", self.base_url);
        let page = page.to_string();

        debug!("TMDB discover: region={}, page={}, sort={:?}", region, page, sort);

        let mut request = self.client.get(&url).query(&[
            ("api_key", self.api_key.as_str()),
            ("watch_region", region.as_str()),
            ("page", page.as_str()),
            ("language", self.language.as_str()),
        ]);

        match sort {
            SortSpec::Default => {}
            SortSpec::Popularity => request = request.query(&[("sort_by", "popularity.desc")]),
            SortSpec::NewestReleases => {
                request = request.query(&[("sort_by", "primary_release_date.desc")])
            }
        }

        let response = ensure_success(request.send().await?, || "discover".to_string()).await?;

        let result: TmdbSearchResponse<TmdbListResult> = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse discover response: {}", e))
        })?;

        Ok(result
            .results
            .into_iter()
            .map(|r| r.into_metadata(MediaType::Movie))
            .collect())
    }

    async fn search_multi(
        &self,
        query: &str,
        region: &Region,
        page: u32,
    ) -> Result<Vec<MetadataTitle>, FailureCause> {
        let url = format!("{}/search/multi", self.base_url);
        let page = page.to_string();

        debug!("TMDB multi search: query='{}', region={}", query, region);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", query),
                ("region", region.as_str()),
                ("page", page.as_str()),
                ("include_adult", "false"),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        let response = ensure_success(response, || format!("search {:?}", query)).await?;

        let result: TmdbSearchResponse<TmdbListResult> = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse multi search response: {}", e))
        })?;

        Ok(result
            .results
            .into_iter()
            .filter_map(|r| {
                let media_type = match r.media_type.as_deref() {
                    Some("movie") => MediaType::Movie,
                    Some("tv") => MediaType::Series,
                    _ => return None,
                };
                Some(r.into_metadata(media_type))
            })
            .collect())
    }

    async fn watch_providers(
        &self,
        tmdb_id: u64,
        media_type: MediaType,
        region: &Region,
    ) -> Result<Vec<String>, FailureCause> {
        let url = format!(
            "{}/{}/{}/watch/providers",
            self.base_url,
            path_segment(media_type),
            tmdb_id
        );

        debug!("TMDB watch providers: id={}, region={}", tmdb_id, region);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        let response =
            ensure_success(response, || format!("{} ID {}", media_type, tmdb_id)).await?;

        let providers: TmdbWatchProviders = response.json().await.map_err(|e| {
            FailureCause::Malformed(format!("Failed to parse watch providers response: {}", e))
        })?;

        Ok(providers.names_for(region))
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn list(
        &self,
        region: &Region,
        page: u32,
        sort: SortSpec,
    ) -> Result<Vec<MetadataTitle>, ProviderFailure> {
        self.discover(region, page, sort)
            .await
            .map_err(|cause| ProviderFailure::metadata(ProviderOperation::List, cause))
    }

    async fn search(
        &self,
        query: &str,
        region: &Region,
        page: u32,
    ) -> Result<Vec<MetadataTitle>, ProviderFailure> {
        self.search_multi(query, region, page)
            .await
            .map_err(|cause| ProviderFailure::metadata(ProviderOperation::Search, cause))
    }

    async fn detail(&self, key: &MetadataKey) -> Result<MetadataTitle, ProviderFailure> {
        let result = match key {
            MetadataKey::Id {
                tmdb_id,
                media_type,
            } => self.get_details(*tmdb_id, *media_type).await,
            MetadataKey::Title { title, media_type } => {
                match self.search_first(title, *media_type).await {
                    Ok(tmdb_id) => self.get_details(tmdb_id, *media_type).await,
                    Err(e) => Err(e),
                }
            }
        };
        result.map_err(|cause| ProviderFailure::metadata(ProviderOperation::Detail, cause))
    }

    async fn sources(
        &self,
        tmdb_id: u64,
        media_type: MediaType,
        region: &Region,
    ) -> Result<Vec<String>, ProviderFailure> {
        self.watch_providers(tmdb_id, media_type, region)
            .await
            .map_err(|cause| ProviderFailure::metadata(ProviderOperation::Sources, cause))
    }
}

fn path_segment(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Series => "tv",
        MediaType::Movie | MediaType::Other => "movie",
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbListResult {
    id: u64,
    #[serde(default)]
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TmdbDetails {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    runtime: Option<u32>,
    #[serde(default)]
    episode_run_time: Vec<u32>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    vote_average: Option<f32>,
    videos: Option<TmdbVideos>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbVideos {
    #[serde(default)]
    results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideo {
    key: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TmdbWatchProviders {
    #[serde(default)]
    results: HashMap<String, TmdbRegionProviders>,
}

#[derive(Debug, Default, Deserialize)]
struct TmdbRegionProviders {
    #[serde(default)]
    flatrate: Vec<TmdbProvider>,
    #[serde(default)]
    free: Vec<TmdbProvider>,
    #[serde(default)]
    ads: Vec<TmdbProvider>,
    #[serde(default)]
    rent: Vec<TmdbProvider>,
    #[serde(default)]
    buy: Vec<TmdbProvider>,
}

#[derive(Debug, Deserialize)]
struct TmdbProvider {
    provider_name: String,
}

// ============================================================================
// Conversions
// ============================================================================

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TmdbListResult {
    fn into_metadata(self, media_type: MediaType) -> MetadataTitle {
        MetadataTitle {
            tmdb_id: self.id,
            media_type,
            title: non_empty(self.title.or(self.name)),
            overview: non_empty(self.overview),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: non_empty(self.release_date.or(self.first_air_date)),
            runtime_minutes: None, // Not available in list results
            episode_runtimes: vec![],
            genres: vec![],
            vote_average: self.vote_average,
            trailer_url: None,
        }
    }
}

impl TmdbDetails {
    fn into_metadata(self, media_type: MediaType) -> MetadataTitle {
        let trailer_url = self.videos.and_then(|v| {
            v.results
                .into_iter()
                .find(|video| video.kind == "Trailer" && video.site == "YouTube")
                .map(|video| format!("https://www.youtube.com/watch?v={}", video.key))
        });

        MetadataTitle {
            tmdb_id: self.id,
            media_type,
            title: non_empty(self.title.or(self.name)),
            overview: non_empty(self.overview),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: non_empty(self.release_date.or(self.first_air_date)),
            runtime_minutes: self.runtime,
            episode_runtimes: self.episode_run_time,
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            vote_average: self.vote_average,
            trailer_url,
        }
    }
}

impl TmdbWatchProviders {
    fn names_for(mut self, region: &Region) -> Vec<String> {
        let providers = self.results.remove(region.as_str()).unwrap_or_default();
        unique_names(
            providers
                .flatrate
                .into_iter()
                .chain(providers.free)
                .chain(providers.ads)
                .chain(providers.rent)
                .chain(providers.buy)
                .map(|p| p.provider_name),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let result = TmdbClient::new(TmdbConfig {
            api_key: String::new(),
            base_url: None,
            language: None,
            timeout_secs: 30,
        });
        assert!(matches!(result, Err(FailureCause::NotConfigured(_))));
    }

    #[test]
    fn test_movie_details_conversion() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "release_date": "1999-03-30",
            "runtime": 136,
            "overview": "A computer hacker...",
            "poster_path": "/poster.jpg",
            "backdrop_path": null,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "vote_average": 8.2,
            "videos": {"results": [
                {"key": "teaser1", "site": "YouTube", "type": "Teaser"},
                {"key": "vimeo1", "site": "Vimeo", "type": "Trailer"},
                {"key": "m8e-FF8MsqU", "site": "YouTube", "type": "Trailer"}
            ]}
        }"#;

        let details: TmdbDetails = serde_json::from_str(json).unwrap();
        let movie = details.into_metadata(MediaType::Movie);

        assert_eq!(movie.tmdb_id, 603);
        assert_eq!(movie.title.as_deref(), Some("The Matrix"));
        assert_eq!(movie.year(), Some(1999));
        assert_eq!(movie.runtime_minutes, Some(136));
        assert_eq!(movie.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(
            movie.trailer_url.as_deref(),
            Some("https://www.youtube.com/watch?v=m8e-FF8MsqU")
        );
    }

    #[test]
    fn test_tv_details_conversion() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "episode_run_time": [45, 47],
            "overview": "",
            "poster_path": "/bb.jpg",
            "genres": [{"id": 18, "name": "Drama"}]
        }"#;

        let details: TmdbDetails = serde_json::from_str(json).unwrap();
        let series = details.into_metadata(MediaType::Series);

        assert_eq!(series.title.as_deref(), Some("Breaking Bad"));
        assert_eq!(series.release_date.as_deref(), Some("2008-01-20"));
        assert_eq!(series.runtime_minutes, None);
        assert_eq!(series.episode_runtimes, vec![45, 47]);
        assert!(series.overview.is_none()); // Empty overview treated as missing
        assert!(series.trailer_url.is_none());
    }

    #[test]
    fn test_list_result_conversion() {
        let json = r#"{"results": [
            {"id": 1, "media_type": "movie", "title": "Heat", "release_date": "1995-12-15"},
            {"id": 2, "media_type": "person", "name": "Al Pacino"}
        ]}"#;

        let response: TmdbSearchResponse<TmdbListResult> = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 2);

        let heat = response.results.into_iter().next().unwrap();
        let movie = heat.into_metadata(MediaType::Movie);
        assert_eq!(movie.title.as_deref(), Some("Heat"));
        assert!(movie.runtime_minutes.is_none()); // Not in list results
    }

    #[test]
    fn test_watch_providers_for_region() {
        let json = r#"{"id": 603, "results": {
            "US": {
                "flatrate": [{"provider_name": "Max"}, {"provider_name": "Netflix"}],
                "rent": [{"provider_name": "Apple TV"}, {"provider_name": "Netflix"}]
            },
            "GB": {"buy": [{"provider_name": "Sky Store"}]}
        }}"#;

        let providers: TmdbWatchProviders = serde_json::from_str(json).unwrap();
        let names = providers.names_for(&Region::parse("us").unwrap());
        assert_eq!(names, vec!["Max", "Netflix", "Apple TV"]);
    }

    #[test]
    fn test_watch_providers_missing_region() {
        let providers: TmdbWatchProviders =
            serde_json::from_str(r#"{"results": {}}"#).unwrap();
        assert!(providers.names_for(&Region::parse("br").unwrap()).is_empty());
    }
}
