//! Upstream provider adapters.
//!
//! Two providers feed the catalog: the availability provider (what is
//! streaming where, Watchmode) and the metadata provider (posters, overviews,
//! runtimes and trailers, TMDB). Both are reached through traits so the
//! aggregator can be driven by mocks in tests.
//!
//! Adapters never retry. Every failure is reported as a [`ProviderFailure`]
//! naming the provider and operation that failed.

mod tmdb;
mod types;
mod watchmode;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;
pub use watchmode::{WatchmodeClient, WatchmodeConfig};

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{MediaType, TitleId};

/// Which upstream provider an operation was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Availability,
    Metadata,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Availability => "availability",
            ProviderKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    List,
    Search,
    Detail,
    Sources,
}

impl ProviderOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderOperation::List => "list",
            ProviderOperation::Search => "search",
            ProviderOperation::Detail => "detail",
            ProviderOperation::Sources => "sources",
        }
    }
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying reason a provider call failed.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimited,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Client not configured (missing or rejected API key).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// A failed provider call.
#[derive(Debug, Error)]
#[error("{provider} provider {operation} failed: {cause}")]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub operation: ProviderOperation,
    #[source]
    pub cause: FailureCause,
}

impl ProviderFailure {
    pub fn new(provider: ProviderKind, operation: ProviderOperation, cause: FailureCause) -> Self {
        Self {
            provider,
            operation,
            cause,
        }
    }

    pub fn availability(operation: ProviderOperation, cause: FailureCause) -> Self {
        Self::new(ProviderKind::Availability, operation, cause)
    }

    pub fn metadata(operation: ProviderOperation, cause: FailureCause) -> Self {
        Self::new(ProviderKind::Metadata, operation, cause)
    }
}

/// Client for the availability provider.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// List titles available in a region.
    async fn list(
        &self,
        region: &Region,
        page: u32,
        sort: SortSpec,
    ) -> Result<Vec<AvailabilityTitle>, ProviderFailure>;

    /// Search titles by name.
    async fn search(
        &self,
        query: &str,
        region: &Region,
        page: u32,
    ) -> Result<Vec<AvailabilityTitle>, ProviderFailure>;

    /// Full details for one title.
    async fn detail(&self, id: &TitleId) -> Result<AvailabilityTitle, ProviderFailure>;

    /// Human-readable names of the platforms streaming a title in a region.
    async fn sources(&self, id: &TitleId, region: &Region)
        -> Result<Vec<String>, ProviderFailure>;
}

/// Client for the metadata provider.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Discover titles with watch availability in a region.
    async fn list(
        &self,
        region: &Region,
        page: u32,
        sort: SortSpec,
    ) -> Result<Vec<MetadataTitle>, ProviderFailure>;

    /// Search movies and series by name.
    async fn search(
        &self,
        query: &str,
        region: &Region,
        page: u32,
    ) -> Result<Vec<MetadataTitle>, ProviderFailure>;

    /// Full metadata for one title, looked up by id or by title.
    async fn detail(&self, key: &MetadataKey) -> Result<MetadataTitle, ProviderFailure>;

    /// Watch-provider names for a title in a region.
    async fn sources(
        &self,
        tmdb_id: u64,
        media_type: MediaType,
        region: &Region,
    ) -> Result<Vec<String>, ProviderFailure>;
}

/// Map a non-success response to a [`FailureCause`].
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    resource: impl FnOnce() -> String,
) -> Result<reqwest::Response, FailureCause> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status.as_u16() {
        401 => Err(FailureCause::NotConfigured("Invalid API key".to_string())),
        404 => Err(FailureCause::NotFound(resource())),
        429 => Err(FailureCause::RateLimited),
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(FailureCause::Status {
                status: code,
                message: body,
            })
        }
    }
}

/// Trimmed, non-empty names with duplicates removed, first occurrence kept.
pub(crate) fn unique_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}
