//! Catalog-Crawler main entry point
//!
//! This is the command-line interface for the catalog crawler.

use anyhow::Context;
use catalog_crawler::config::{load_config_with_hash, Config};
use catalog_crawler::crawler::run_crawl;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog-Crawler: a sequential catalog crawler
///
/// Walks a paginated catalog listing, extracts title, price, rating,
/// availability, category and image from every item's detail page and
/// writes the resulting dataset to CSV and/or SQLite.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A sequential catalog crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest stored run and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
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
            return Err(e).with_context(|| format!("invalid configuration in {}", cli.config.display()));
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_crawler=info,warn"),
            1 => EnvFilter::new("catalog_crawler=debug,info"),
            2 => EnvFilter::new("catalog_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    match config.crawler.max_pages {
        Some(max) => println!("  Max listing pages: {}", max),
        None => println!("  Max listing pages: unlimited"),
    }
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(none)")
    );
    println!(
        "  CSV: {}",
        config.output.csv_path.as_deref().unwrap_or("(none)")
    );

    println!("\nSelectors:");
    for (name, selector) in config.selectors.entries() {
        println!("  {}: {}", name, selector);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.crawler.start_url);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use catalog_crawler::output::{load_statistics, print_statistics};
    use catalog_crawler::storage::SqliteStorage;

    let path = config
        .output
        .database_path
        .as_deref()
        .context("--stats needs output.database-path in the configuration")?;

    println!("Database: {}\n", path);

    let storage = SqliteStorage::new(Path::new(path))
        .with_context(|| format!("failed to open database {}", path))?;

    match load_statistics(&storage).context("failed to load statistics")? {
        Some(stats) => print_statistics(&stats),
        None => println!("No crawl runs recorded yet"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let token = CancellationToken::new();

    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            interrupt.cancel();
        }
    });

    let report = match run_crawl(config, config_hash, token).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e).context("crawl failed");
        }
    };

    if report.success {
        tracing::info!("Crawl completed successfully");
        println!("✓ {}", report.message);
        if let Some(path) = &report.csv_path {
            println!("  CSV: {}", path.display());
        }
        if let Some(path) = &report.database_path {
            println!("  Database: {}", path.display());
        }
    } else {
        println!("✗ {}", report.message);
    }

    Ok(())
}
