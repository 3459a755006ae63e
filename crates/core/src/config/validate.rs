use super::{types::Config, CacheBackend, ConfigError};

/// Upper bound for any cache duration setting (ten years).
pub const MAX_CACHE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Validate configuration
/// Currently validates:
/// - Both API keys are set
/// - Availability page size is not 0
/// - Page TTL is not 0
/// - Cache TTLs and the sweep interval are at most ten years
/// - Sqlite backend has a path
/// - Collector cap is not 0 and the prefetch threshold is within [0, 1)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.availability.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "availability.api_key cannot be empty".to_string(),
        ));
    }

    if config.metadata.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "metadata.api_key cannot be empty".to_string(),
        ));
    }

    if config.availability.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "availability.page_size cannot be 0".to_string(),
        ));
    }

    if config.cache.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.ttl_secs cannot be 0".to_string(),
        ));
    }

    for (name, secs) in [
        ("cache.ttl_secs", config.cache.ttl_secs),
        ("cache.sources_ttl_secs", config.cache.sources_ttl_secs),
        ("cache.sweep_interval_secs", config.cache.sweep_interval_secs),
    ] {
        if secs > MAX_CACHE_SECS {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at most {}, got {}",
                name, MAX_CACHE_SECS, secs
            )));
        }
    }

    if config.cache.backend == CacheBackend::Sqlite && config.cache.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.path is required when cache.backend = \"sqlite\"".to_string(),
        ));
    }

    if config.collector.max_records == 0 {
        return Err(ConfigError::ValidationError(
            "collector.max_records cannot be 0".to_string(),
        ));
    }

    let threshold = config.collector.prefetch_threshold;
    if !(0.0..1.0).contains(&threshold) {
        return Err(ConfigError::ValidationError(format!(
            "collector.prefetch_threshold must be in [0, 1), got {}",
            threshold
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use tokio_test::{assert_err, assert_ok};

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[availability]
api_key = "wm"

[metadata]
api_key = "tmdb"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert_ok!(validate_config(&valid_config()));
    }

    #[test]
    fn test_validate_empty_api_key_fails() {
        let mut config = valid_config();
        config.metadata.api_key = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("metadata.api_key"));
    }

    #[test]
    fn test_validate_zero_cap_fails() {
        let mut config = valid_config();
        config.collector.max_records = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = valid_config();
        config.collector.prefetch_threshold = 1.0;
        assert_err!(validate_config(&config));

        config.collector.prefetch_threshold = -0.1;
        assert_err!(validate_config(&config));

        config.collector.prefetch_threshold = 0.0;
        assert_ok!(validate_config(&config));
    }

    #[test]
    fn test_validate_zero_ttl_fails() {
        let mut config = valid_config();
        config.cache.ttl_secs = 0;
        assert_err!(validate_config(&config));
    }

    #[test]
    fn test_validate_huge_cache_durations_fail() {
        let mut config = valid_config();
        config.cache.ttl_secs = i64::MAX as u64;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("cache.ttl_secs"));

        let mut config = valid_config();
        config.cache.sources_ttl_secs = MAX_CACHE_SECS + 1;
        assert_err!(validate_config(&config));

        let mut config = valid_config();
        config.cache.sweep_interval_secs = u64::MAX;
        assert_err!(validate_config(&config));

        config.cache.sweep_interval_secs = MAX_CACHE_SECS;
        assert_ok!(validate_config(&config));
    }

    #[test]
    fn test_validate_sqlite_without_path_fails() {
        let mut config = valid_config();
        config.cache.backend = CacheBackend::Sqlite;
        config.cache.path = std::path::PathBuf::new();
        assert_err!(validate_config(&config));
    }
}
