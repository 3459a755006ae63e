use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::provider::{Region, TmdbConfig, WatchmodeConfig};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub availability: WatchmodeConfig,
    pub metadata: TmdbConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Storage backend (default: memory)
    #[serde(default)]
    pub backend: CacheBackend,
    /// Database path, used when backend = "sqlite"
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// TTL of cached pages in seconds (default: 300)
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// TTL of cached platform lists and details in seconds (default: 600)
    #[serde(default = "default_sources_ttl")]
    pub sources_ttl_secs: u64,
    /// Interval of the expired-entry sweeper in seconds, 0 disables it (default: 60)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: default_cache_path(),
            ttl_secs: default_ttl(),
            sources_ttl_secs: default_sources_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("streamdex-cache.db")
}

fn default_ttl() -> u64 {
    300
}

fn default_sources_ttl() -> u64 {
    600
}

fn default_sweep_interval() -> u64 {
    60
}

/// Available cache backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Collector configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CollectorConfig {
    /// Maximum records held by one session (default: 102)
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Scroll ratio past which the next page is prefetched (default: 0.3)
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: f64,
    /// Region used when the caller does not supply one (default: US)
    #[serde(default)]
    pub default_region: Region,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            prefetch_threshold: default_prefetch_threshold(),
            default_region: Region::default(),
        }
    }
}

fn default_max_records() -> usize {
    102
}

fn default_prefetch_threshold() -> f64 {
    0.3
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub availability: SanitizedAvailabilityConfig,
    pub metadata: SanitizedMetadataConfig,
    pub cache: CacheConfig,
    pub collector: CollectorConfig,
}

/// Sanitized availability config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAvailabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub api_key_configured: bool,
    pub page_size: u32,
    pub timeout_secs: u32,
}

/// Sanitized metadata config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMetadataConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            availability: SanitizedAvailabilityConfig {
                base_url: config.availability.base_url.clone(),
                api_key_configured: !config.availability.api_key.is_empty(),
                page_size: config.availability.page_size,
                timeout_secs: config.availability.timeout_secs,
            },
            metadata: SanitizedMetadataConfig {
                base_url: config.metadata.base_url.clone(),
                language: config.metadata.language.clone(),
                api_key_configured: !config.metadata.api_key.is_empty(),
                timeout_secs: config.metadata.timeout_secs,
            },
            cache: config.cache.clone(),
            collector: config.collector.clone(),
        }
    }
}
