//! Catalogue Harvester main entry point
//!
//! This is the command-line interface for the sitemap harvester.

use anyhow::Context;
use catalogue_harvester::config::{load_config_with_hash, validate, Config};
use catalogue_harvester::harvest::Harvester;
use catalogue_harvester::output::{load_statistics, print_report, print_statistics};
use catalogue_harvester::storage::{lock_storage, SqliteStorage, Storage};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalogue Harvester: sitemap-driven product catalogue scraper
///
/// Reads the configured sitemaps, fetches every listed page that is not yet
/// stored, extracts part numbers and compatibility lists, stores them in
/// SQLite and exports the store to CSV. Runs with built-in defaults when no
/// configuration file is given.
#[derive(Parser, Debug)]
#[command(name = "catalogue-harvester")]
#[command(version)]
#[command(about = "Sitemap-driven product catalogue harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show the effective configuration without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "export_only"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_only"])]
    stats: bool,

    /// Export the existing database to CSV without harvesting
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "no_export"])]
    export_only: bool,

    /// Harvest without writing the CSV export
    #[arg(long)]
    no_export: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_only {
        handle_export_only(&config)?;
    } else {
        handle_harvest(config, !cli.no_export).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalogue_harvester=info,warn"),
            1 => EnvFilter::new("catalogue_harvester=debug,info"),
            2 => EnvFilter::new("catalogue_harvester=trace,debug"),
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

/// Loads the configuration file, or falls back to the built-in defaults
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Catalogue Harvester Dry Run ===\n");

    println!("Harvest:");
    println!(
        "  Max concurrent requests: {}",
        config.harvest.max_concurrent_requests
    );
    println!("  Retry: {} attempts, {}ms apart", config.retry.max_attempts, config.retry.delay_ms);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Request timeout: {}s", config.http.request_timeout_secs);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Export: {}", config.output.export_path);

    println!("\nExtractor:");
    println!("  Article rows: {}", config.extractor.article_row_selector);
    println!("  Part number label: {}", config.extractor.part_no_label);
    println!(
        "  Compatibility rows: {}",
        config.extractor.compatibility_row_selector
    );

    println!("\nSitemaps ({}):", config.harvest.sitemaps.len());
    for sitemap in &config.harvest.sitemaps {
        println!("  - {}", sitemap);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-only mode: rewrites the CSV from the database
fn handle_export_only(config: &Config) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let rows = storage.export_all(Path::new(&config.output.export_path))?;

    println!("✓ Exported {} records to {}", rows, config.output.export_path);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, export: bool) -> anyhow::Result<()> {
    let export_path = config.output.export_path.clone();
    let harvester = Harvester::new(config).context("failed to initialize the store")?;

    // Ctrl-C stops in-flight requests; what was stored so far is still exported
    let shutdown = harvester.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling in-flight requests");
            shutdown.cancel();
        }
    });

    let report = match harvester.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    if export {
        let rows = harvester.export()?;
        println!("\n📂 Exported {} records to {}\n", rows, export_path);
    }

    print_report(&report);

    if report.has_failures() {
        tracing::warn!(
            "Harvest finished with {} failed links and {} of {} sitemaps fetched",
            report.failed,
            report.sitemaps_fetched,
            report.sitemaps_requested
        );
    }

    let total = lock_storage(&harvester.storage())?.count_records()?;
    tracing::info!("Store now holds {} records", total);

    Ok(())
}
