//! Crawler module for catalog traversal and field extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - Lazy listing traversal with pagination
//! - Declarative per-field extraction from detail pages
//! - Overall crawl coordination and the end-to-end run driver

mod coordinator;
mod document;
mod extractor;
mod fetcher;
mod listing;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Coordinator, CrawlResult, ItemObserver, ItemOutcome, ItemStatus};
pub use document::{element_attr, element_text, resolve, CatalogSelectors, Document};
pub use extractor::{policy_for, ExtractionError, Field, FieldExtractor, FieldPolicy, FieldRule, FIELD_RULES};
pub use fetcher::{build_http_client, user_agent_string, Fetcher, HttpFetcher, TransportError};
pub use listing::{ListingWalker, WalkEnd};

use crate::config::Config;
use crate::dataset::{assemble, Dataset};
use crate::output::{persist_all, CsvSink, DatasetSink, SqliteSink};
use crate::storage::{open_storage, RunStatus, SqliteStorage, Storage};
use crate::Result;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Outcome of one end-to-end run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// True when at least one record was persisted
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Rows handed to each sink
    pub records_written: usize,

    /// Detail pages attempted
    pub attempted: u64,

    /// Detail pages that produced a record
    pub succeeded: u64,

    /// Whether the run stopped on cancellation
    pub cancelled: bool,

    /// Storage run id, when a database is configured
    pub run_id: Option<i64>,

    pub csv_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
}

/// Runs a complete crawl against the live site
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client from configuration
/// 2. Open the database and create a run (if configured)
/// 3. Walk the listing and extract every detail page
/// 4. Assemble the dataset and persist it to every configured sink
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    token: CancellationToken,
) -> Result<RunReport> {
    let fetcher = HttpFetcher::from_config(&config.user_agent, &config.crawler)?;
    execute(fetcher, config, config_hash, &token).await
}

/// Runs a complete crawl with the given fetcher
pub async fn execute<F: Fetcher>(
    fetcher: F,
    config: &Config,
    config_hash: &str,
    token: &CancellationToken,
) -> Result<RunReport> {
    let database_path = config.output.database_path.as_ref().map(PathBuf::from);
    let csv_path = config.output.csv_path.as_ref().map(PathBuf::from);

    // No run row is created until setup has succeeded
    let mut coordinator = Coordinator::from_config(fetcher, config)?;

    let mut storage = match &database_path {
        Some(path) => {
            let mut storage = open_storage(path)?;
            let run_id = storage.create_run(config_hash)?;
            tracing::info!("Created run {} in {}", run_id, path.display());
            Some((storage, run_id))
        }
        None => None,
    };

    let result = coordinator.run(token).await;
    let (attempted, succeeded, cancelled) = (result.attempted, result.succeeded, result.cancelled);

    let dataset = assemble(result.records);

    if dataset.is_empty() {
        tracing::warn!("No records were collected from {} attempted items", attempted);
        if let Some((storage, run_id)) = storage.as_mut() {
            storage.finish_run(*run_id, RunStatus::Empty, attempted, succeeded)?;
        }
        return Ok(RunReport {
            success: false,
            message: "no records were collected".to_string(),
            records_written: 0,
            attempted,
            succeeded,
            cancelled,
            run_id: storage.as_ref().map(|(_, run_id)| *run_id),
            csv_path: None,
            database_path: None,
        });
    }

    let persisted = persist(&dataset, csv_path.as_deref(), storage.as_mut());

    let status = match (&persisted, cancelled) {
        (Err(_), _) | (Ok(_), true) => RunStatus::Interrupted,
        (Ok(_), false) => RunStatus::Completed,
    };
    if let Some((storage, run_id)) = storage.as_mut() {
        storage.finish_run(*run_id, status, attempted, succeeded)?;
    }
    persisted?;

    let mut message = format!(
        "collected {} records ({} of {} items extracted)",
        dataset.len(),
        succeeded,
        attempted
    );
    if cancelled {
        message.push_str(", stopped early on cancellation");
    }

    Ok(RunReport {
        success: true,
        message,
        records_written: dataset.len(),
        attempted,
        succeeded,
        cancelled,
        run_id: storage.as_ref().map(|(_, run_id)| *run_id),
        csv_path,
        database_path,
    })
}

/// Writes the dataset to the CSV file and the run's database rows
fn persist(
    dataset: &Dataset,
    csv_path: Option<&Path>,
    storage: Option<&mut (SqliteStorage, i64)>,
) -> Result<()> {
    let mut csv_sink = csv_path.map(CsvSink::new);
    let mut sqlite_sink = storage.map(|(storage, run_id)| SqliteSink::new(storage, *run_id));

    let mut sinks: Vec<&mut dyn DatasetSink> = Vec::new();
    if let Some(sink) = csv_sink.as_mut() {
        sinks.push(sink);
    }
    if let Some(sink) = sqlite_sink.as_mut() {
        sinks.push(sink);
    }

    for (name, count) in persist_all(dataset, &mut sinks)? {
        tracing::debug!("Sink {} wrote {} rows", name, count);
    }
    Ok(())
}
