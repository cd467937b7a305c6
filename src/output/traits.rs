//! Dataset sink trait and output error types

use crate::dataset::Dataset;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for an assembled dataset
///
/// A sink receives one dataset per run and writes every row, in order, in
/// `Dataset::COLUMNS` order. Sinks are never handed an empty dataset.
pub trait DatasetSink {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Writes every row of `dataset`
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn persist(&mut self, dataset: &Dataset) -> OutputResult<usize>;
}
