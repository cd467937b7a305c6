//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::dataset::DatasetRow;
use crate::storage::{RunRecord, RunStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Run {0} is already finished")]
    RunFinished(i64),

    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// A run is created before the crawl starts, receives the assembled dataset
/// once, and is finished with its final counters.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `Running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Records the final status and counters of a run
    ///
    /// Fails with `RunFinished` if the run already left the `Running` state.
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        attempted: u64,
        succeeded: u64,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Dataset =====

    /// Inserts every row for `run_id` in a single transaction
    fn insert_books(&mut self, run_id: i64, rows: &[DatasetRow]) -> StorageResult<usize>;

    /// Loads the rows of a run ordered by id
    fn load_books(&self, run_id: i64) -> StorageResult<Vec<DatasetRow>>;

    /// Counts the rows stored for a run
    fn count_books(&self, run_id: i64) -> StorageResult<u64>;

    // ===== Statistics =====

    /// Mean price of a run's rows, `None` when it has none
    fn average_price(&self, run_id: i64) -> StorageResult<Option<f64>>;

    /// Row count per rating value
    fn rating_distribution(&self, run_id: i64) -> StorageResult<BTreeMap<u8, u64>>;

    /// Number of distinct categories in a run
    fn count_categories(&self, run_id: i64) -> StorageResult<u64>;
}
