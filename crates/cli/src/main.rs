//! Streamdex command-line client.
//!
//! Fetches enriched catalog pages, drives incremental collection sessions
//! and inspects per-title availability from the terminal.

mod engine;
mod metrics;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streamdex_core::{
    load_config, validate_config, CollectorState, Config, FetchOutcome, PageOperation,
    QueryShape, Region, SanitizedConfig, TitleId,
};

use crate::engine::Engine;

#[derive(Parser, Debug)]
#[command(name = "streamdex", about = "Streaming catalog aggregation client")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, env = "STREAMDEX_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a single enriched catalog page
    Page {
        #[command(flatten)]
        query: QueryArgs,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Collect pages incrementally into a capped, deduplicated list
    Browse {
        #[command(flatten)]
        query: QueryArgs,

        /// Maximum number of pages to request
        #[arg(long, default_value_t = 3)]
        pages: u32,

        /// Resume from and save the session state to this file
        #[arg(long)]
        state: Option<PathBuf>,

        /// Load streaming platforms for every collected record
        #[arg(long)]
        platforms: bool,
    },
    /// List the streaming platforms offering a title
    Sources {
        id: String,

        #[arg(long)]
        region: Option<String>,
    },
    /// Show the enriched detail record for a title
    Details { id: String },
    /// Print the effective configuration with secrets redacted
    Config,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    ByRegion,
    Popular,
    NewReleases,
    Search,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    #[arg(long, value_enum, default_value_t = Mode::ByRegion)]
    mode: Mode,

    /// Search text, required with `--mode search`
    #[arg(long)]
    query: Option<String>,

    /// Two-letter region code, defaults to the configured region
    #[arg(long)]
    region: Option<String>,
}

impl QueryArgs {
    fn operation(&self) -> Result<PageOperation> {
        Ok(match self.mode {
            Mode::ByRegion => PageOperation::ByRegion,
            Mode::Popular => PageOperation::Popular,
            Mode::NewReleases => PageOperation::NewReleases,
            Mode::Search => match self.query.as_deref().map(str::trim) {
                Some(query) if !query.is_empty() => PageOperation::search(query),
                _ => bail!("--query is required with --mode search"),
            },
        })
    }

    fn shape(&self, config: &Config) -> Result<QueryShape> {
        Ok(QueryShape::new(
            resolve_region(self.region.as_deref(), config)?,
            self.operation()?,
        ))
    }
}

fn resolve_region(region: Option<&str>, config: &Config) -> Result<Region> {
    match region {
        Some(code) => Region::parse(code).context("Invalid --region"),
        None => Ok(config.collector.default_region.clone()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let print_metrics = cli.metrics;

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }

    if print_metrics {
        eprint!("{}", metrics::encode_metrics());
    }
}

async fn run(cli: Cli) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Loading config from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Config validation failed")?;

    match cli.command {
        Command::Config => print_json(&SanitizedConfig::from(&config)),
        Command::Page { query, page } => {
            let engine = Engine::from_config(&config)?;
            let request = query.shape(&config)?.request(page);
            let page = engine.aggregator().fetch_page(&request).await;
            info!("{} returned {} records", request.cache_key(), page.len());
            print_json(&page)
        }
        Command::Browse {
            query,
            pages,
            state,
            platforms,
        } => {
            let engine = Engine::from_config(&config)?;
            let shape = query.shape(&config)?;
            browse(&engine, shape, pages, state.as_deref(), platforms).await
        }
        Command::Sources { id, region } => {
            let engine = Engine::from_config(&config)?;
            let region = resolve_region(region.as_deref(), &config)?;
            let platforms = engine
                .aggregator()
                .fetch_platforms(&TitleId::new(id), &region)
                .await;
            print_json(&platforms)
        }
        Command::Details { id } => {
            let engine = Engine::from_config(&config)?;
            match engine.aggregator().fetch_details(&TitleId::new(id.clone())).await {
                Some(record) => print_json(&record),
                None => bail!("No details available for title {}", id),
            }
        }
    }
}

async fn browse(
    engine: &Engine,
    shape: QueryShape,
    pages: u32,
    state_path: Option<&Path>,
    load_platforms: bool,
) -> Result<()> {
    let collector = engine.collector(shape.clone());

    if let Some(path) = state_path.filter(|p| p.exists()) {
        if let Some(state) = read_session(path, &shape)? {
            info!("Resuming {} at page {}", shape, state.next_page);
            collector.restore(state);
        }
    }

    for _ in 0..pages {
        match collector.request_next().await {
            FetchOutcome::Loaded { received, total } => {
                info!("Loaded {} records ({} total)", received, total);
            }
            FetchOutcome::Empty | FetchOutcome::Exhausted => break,
            outcome => warn!("Unexpected fetch outcome: {}", outcome.as_str()),
        }
    }

    if load_platforms {
        for record in collector.records() {
            collector.load_platforms(&record.id).await;
        }
    }

    let snapshot = collector.snapshot();
    if let Some(path) = state_path {
        write_session(path, &shape, &snapshot)?;
        info!("Saved session state to {:?}", path);
    }
    print_json(&snapshot)
}

/// Session file written by `browse --state`.
#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    shape: QueryShape,
    state: CollectorState,
}

/// Saved state for `shape`, or `None` when the file belongs to another query.
fn read_session(path: &Path, shape: &QueryShape) -> Result<Option<CollectorState>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session state {:?}", path))?;
    let saved: SavedSession = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid session state {:?}", path))?;

    if saved.shape != *shape {
        info!(
            "Session in {:?} is for {}, starting {} from page 1",
            path, saved.shape, shape
        );
        return Ok(None);
    }
    Ok(Some(saved.state))
}

fn write_session(path: &Path, shape: &QueryShape, state: &CollectorState) -> Result<()> {
    let saved = SavedSession {
        shape: shape.clone(),
        state: state.clone(),
    };
    let json = serde_json::to_string_pretty(&saved)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write session state {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::Arc;
    use streamdex_core::testing::{fixtures, MockAvailabilityProvider, MockMetadataProvider};
    use streamdex_core::{load_config_from_str, MemoryCache};

    fn config() -> Config {
        load_config_from_str(
            r#"
[availability]
api_key = "wm"

[metadata]
api_key = "tmdb"

[collector]
default_region = "GB"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_page_defaults() {
        let cli = Cli::try_parse_from(["streamdex", "page"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        match cli.command {
            Command::Page { query, page } => {
                assert_eq!(query.mode, Mode::ByRegion);
                assert_eq!(page, 1);
                assert!(query.region.is_none());
            }
            other => panic!("expected page command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_with_global_config() {
        let cli = Cli::try_parse_from([
            "streamdex",
            "page",
            "--mode",
            "search",
            "--query",
            "heat",
            "--config",
            "/etc/streamdex.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/streamdex.toml"));
        match cli.command {
            Command::Page { query, .. } => {
                assert_eq!(query.operation().unwrap(), PageOperation::search("heat"));
            }
            other => panic!("expected page command, got {:?}", other),
        }
    }

    #[test]
    fn test_search_without_query_is_rejected() {
        let args = QueryArgs {
            mode: Mode::Search,
            query: Some("   ".to_string()),
            region: None,
        };
        assert!(args.operation().is_err());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["streamdex", "page", "--mode", "trending"]).is_err());
    }

    #[test]
    fn test_parse_browse() {
        let cli = Cli::try_parse_from([
            "streamdex",
            "browse",
            "--mode",
            "new-releases",
            "--pages",
            "5",
            "--platforms",
        ])
        .unwrap();
        match cli.command {
            Command::Browse {
                query,
                pages,
                state,
                platforms,
            } => {
                assert_eq!(query.mode, Mode::NewReleases);
                assert_eq!(pages, 5);
                assert!(state.is_none());
                assert!(platforms);
            }
            other => panic!("expected browse command, got {:?}", other),
        }
    }

    #[test]
    fn test_region_falls_back_to_config() {
        let config = config();
        assert_eq!(resolve_region(None, &config).unwrap().as_str(), "GB");
        assert_eq!(resolve_region(Some("de"), &config).unwrap().as_str(), "DE");
        assert!(resolve_region(Some("USA"), &config).is_err());
    }

    fn shape(region: &str, operation: PageOperation) -> QueryShape {
        QueryShape::new(Region::parse(region).unwrap(), operation)
    }

    #[test]
    fn test_session_file_resumes_same_shape() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        let us = shape("US", PageOperation::search("heat"));
        let mut state = CollectorState::default();
        state.next_page = 4;
        state.has_more = false;

        write_session(&path, &us, &state).unwrap();
        assert_eq!(read_session(&path, &us).unwrap(), Some(state));
    }

    #[test]
    fn test_session_file_for_other_shape_is_ignored() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        let mut state = CollectorState::default();
        state.next_page = 2;

        write_session(&path, &shape("US", PageOperation::ByRegion), &state).unwrap();

        assert_eq!(
            read_session(&path, &shape("GB", PageOperation::ByRegion)).unwrap(),
            None
        );
        assert_eq!(
            read_session(&path, &shape("US", PageOperation::Popular)).unwrap(),
            None
        );
    }

    #[test]
    fn test_session_file_without_shape_is_rejected() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        let state = serde_json::to_string(&CollectorState::default()).unwrap();
        std::fs::write(&path, state).unwrap();

        assert!(read_session(&path, &shape("US", PageOperation::ByRegion)).is_err());
    }

    #[tokio::test]
    async fn test_browse_in_new_region_starts_fresh() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        let availability = Arc::new(MockAvailabilityProvider::new());
        for page in 1..=3 {
            availability
                .set_listing(
                    page,
                    vec![fixtures::listing_with_poster(page as u64, "Title")],
                )
                .await;
        }
        let engine = Engine::with_parts(
            availability.clone(),
            Arc::new(MockMetadataProvider::new()),
            Arc::new(MemoryCache::new()),
            config(),
            None,
        );

        let us = shape("US", PageOperation::ByRegion);
        browse(&engine, us.clone(), 2, Some(&path), false).await.unwrap();
        let saved = read_session(&path, &us).unwrap().unwrap();
        assert_eq!(saved.next_page, 3);

        let gb = shape("GB", PageOperation::ByRegion);
        browse(&engine, gb.clone(), 1, Some(&path), false).await.unwrap();
        let saved = read_session(&path, &gb).unwrap().unwrap();
        assert_eq!(saved.next_page, 2);
        assert_eq!(saved.records.len(), 1);
        assert_eq!(saved.records[0].id, TitleId::from(1u64));
    }
}
