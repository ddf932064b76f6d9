//! Adlib-Harvest main entry point
//!
//! This is the command-line interface for the Adlib-Harvest extraction engine.

use adlib_harvest::config::{load_config_with_hash, validate_for_mode, Config, RunMode};
use adlib_harvest::crawler::Coordinator;
use adlib_harvest::output::{print_summary, JsonLinesSink, RecordSink, SinkSet, SqliteSink};
use adlib_harvest::state::RunState;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Adlib-Harvest: an adaptive ad library extraction engine
///
/// Collects ad records either by paging through the structured archive API or
/// by crawling rendered listing pages and mining their markup.
#[derive(Parser, Debug)]
#[command(name = "adlib-harvest")]
#[command(version)]
#[command(about = "An adaptive ad library extraction engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Acquisition mode
    #[arg(long, value_enum, default_value_t = Mode::Search)]
    mode: Mode,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Search,
    Crawl,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Search => RunMode::Search,
            Mode::Crawl => RunMode::Crawl,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).context("invalid configuration");
        }
    };

    let mode = RunMode::from(cli.mode);
    validate_for_mode(&config, mode)
        .with_context(|| format!("configuration not usable for {} mode", mode.as_str()))?;

    if cli.dry_run {
        handle_dry_run(&config, mode);
        return Ok(());
    }

    handle_run(config, config_hash, mode).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("adlib_harvest=info,warn"),
            1 => EnvFilter::new("adlib_harvest=debug,info"),
            2 => EnvFilter::new("adlib_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: prints the effective settings for the chosen mode
fn handle_dry_run(config: &Config, mode: RunMode) {
    println!("=== Adlib-Harvest Dry Run ({}) ===\n", mode.as_str());

    println!("Fetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  User agent: {}", config.fetch.user_agent);

    match mode {
        RunMode::Search => {
            println!("\nSearch:");
            println!("  Endpoint: {}", config.api.endpoint);
            println!(
                "  Terms: {}",
                config.search.search_terms.as_deref().unwrap_or("(none)")
            );
            println!("  Countries: {}", config.search.countries.join(", "));
            println!("  Active status: {}", config.search.active_status.as_param());
            println!("  Ad type: {}", config.search.ad_type.as_param());
            println!("  Page size: {}", config.search.limit);
            println!("  Max pages: {}", config.search.max_pages);
            println!("  Rate-limit cooldown: {}s", config.api.rate_limit_cooldown_secs);
            println!("  Polite delay: {}ms", config.api.polite_delay_ms);
        }
        RunMode::Crawl => {
            println!("\nCrawl:");
            println!("  Budget: {} record(s)", config.crawl.max_pages);
            println!("  Max depth: {}", config.crawl.max_depth);
            println!("  Concurrency: {}", config.crawl.concurrency);
            println!("\nSeeds ({}):", config.crawl.seeds.len());
            for seed in &config.crawl.seeds {
                println!("  - {}", seed);
            }
            if !config.crawl.allowed_domains.is_empty() {
                println!("\nAllowed domains ({}):", config.crawl.allowed_domains.len());
                for domain in &config.crawl.allowed_domains {
                    println!("  - {}", domain);
                }
            }
        }
    }

    println!("\nOutput:");
    println!(
        "  JSON Lines: {}",
        config.output.jsonl_path.as_deref().unwrap_or("(disabled)")
    );
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(disabled)")
    );

    println!("\n✓ Configuration is valid");
}

/// Opens the sinks named in the output configuration
fn open_sinks(config: &Config) -> Result<SinkSet> {
    let mut sinks = SinkSet::new();

    if let Some(path) = &config.output.jsonl_path {
        let sink = JsonLinesSink::create(Path::new(path))
            .with_context(|| format!("cannot open JSON Lines output {}", path))?;
        sinks.push(Box::new(sink));
    }

    if let Some(path) = &config.output.database_path {
        let sink = SqliteSink::new(Path::new(path))
            .with_context(|| format!("cannot open database {}", path))?;
        sinks.push(Box::new(sink));
    }

    if sinks.is_empty() {
        tracing::warn!("No output configured; records will only be counted");
    }

    Ok(sinks)
}

/// Handles the main harvest operation
async fn handle_run(config: Config, config_hash: String, mode: RunMode) -> Result<()> {
    let mut sinks = open_sinks(&config)?;
    let coordinator = Coordinator::new(config, config_hash)?;

    let cancel = CancellationToken::new();
    let state = RunState::with_cancellation(cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing with the records collected so far");
            cancel.cancel();
        }
    });

    match coordinator.run(mode, &state, &mut sinks as &mut dyn RecordSink).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
