//! photo-harvest main entry point
//!
//! This is the command-line interface for the photo metadata harvester.

use anyhow::{bail, Context};
use clap::Parser;
use photo_harvest::config::{load_config_with_hash, Config};
use photo_harvest::harvest::{HarvestContext, Harvester};
use photo_harvest::output::{load_statistics, print_report, print_statistics};
use photo_harvest::progress::MarkerSink;
use photo_harvest::source::FlickrSource;
use photo_harvest::store::{open_store, RunStatus, RunTotals};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// photo-harvest: concurrent photo metadata harvester
///
/// Fetches the configured result pages of an account's photos, extracts
/// title, description, size-variant URLs and original dimensions for each
/// photo, and stores one record per photo plus an ordered index.
#[derive(Parser, Debug)]
#[command(name = "photo-harvest")]
#[command(version)]
#[command(about = "Concurrent photo metadata harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("photo_harvest=info,warn"),
            1 => EnvFilter::new("photo_harvest=debug,info"),
            2 => EnvFilter::new("photo_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Progress markers own stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== photo-harvest Dry Run ===\n");

    println!("Source:");
    println!("  Endpoint: {}", config.flickr.endpoint);
    println!("  Owner: {}", config.flickr.owner_id);
    println!("  Request timeout: {}s", config.flickr.request_timeout_secs);

    let harvest = &config.harvest;
    println!("\nHarvest:");
    println!(
        "  Pages: {}..={} ({} photos per page)",
        harvest.first_page, harvest.last_page, harvest.page_size
    );
    println!("  Fetch workers: {}", harvest.fetch_workers);
    println!("  Persistence workers: {}", harvest.persist_workers);
    match harvest.persist_queue_capacity {
        Some(capacity) => println!("  Persistence queue capacity: {}", capacity),
        None => println!("  Persistence queue capacity: unbounded"),
    }

    println!("\nStore:");
    println!("  Database: {}", config.store.database_path);
    println!("  Key prefix: {}", config.store.key_prefix);
    println!("  Index: {}", config.store.index_name);

    let pages = harvest.pages().count() as u64;
    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would request {} pages (at most {} photos)",
        pages,
        pages * u64::from(harvest.page_size)
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.store.database_path);

    let store = open_store(Path::new(&config.store.database_path))?;
    let stats = load_statistics(&store, &config.store.index_name)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let store = Arc::new(open_store(Path::new(&config.store.database_path))?);
    let source = Arc::new(FlickrSource::new(&config.flickr)?);
    let run_id = store.create_run(config_hash)?;
    tracing::info!("Starting harvest run {}", run_id);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping harvest");
            ctrl_c.cancel();
        }
    });

    let harvester = Harvester::new(HarvestContext {
        config,
        source,
        store: store.clone(),
        progress: Arc::new(MarkerSink::stdout()),
    });

    let report = match harvester.run(cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            if let Err(finish_err) = store.finish_run(run_id, RunStatus::Failed, RunTotals::default())
            {
                tracing::warn!("Failed to record failed run: {}", finish_err);
            }
            return Err(e.into());
        }
    };

    store.finish_run(run_id, report.status(), report.totals())?;
    print_report(&report);

    if report.cancelled {
        bail!("harvest cancelled");
    }
    if !report.failed_writes.is_empty() {
        bail!(
            "{} of {} records could not be written",
            report.failed_writes.len(),
            report.photos_enqueued
        );
    }

    Ok(())
}
