//! Configuration sources.
//!
//! Settings come from a TOML file, then `STREAMDEX_*` environment variables.
//! Nested keys use a double underscore, so `STREAMDEX_METADATA__API_KEY`
//! overrides `[metadata] api_key` and `STREAMDEX_COLLECTOR__MAX_RECORDS`
//! overrides `[collector] max_records`.

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use super::{types::Config, ConfigError};

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "STREAMDEX_";

/// Load `path`, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Parse an in-memory TOML document, without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    Figment::from(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
