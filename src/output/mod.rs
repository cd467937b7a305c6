//! Output module for persisting datasets and reporting on stored runs
//!
//! This module handles:
//! - Writing the assembled dataset to CSV and SQLite sinks
//! - Loading and printing statistics of the latest run

mod csv_output;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::CsvSink;
pub use sqlite_output::SqliteSink;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{DatasetSink, OutputError, OutputResult};

use crate::dataset::Dataset;

/// Persists `dataset` to every sink in order
///
/// Stops at the first failing sink.
///
/// # Returns
///
/// The number of rows written by each sink, by sink name
pub fn persist_all(
    dataset: &Dataset,
    sinks: &mut [&mut dyn DatasetSink],
) -> OutputResult<Vec<(&'static str, usize)>> {
    let mut written = Vec::with_capacity(sinks.len());
    for sink in sinks.iter_mut() {
        let count = sink.persist(dataset)?;
        written.push((sink.name(), count));
    }
    Ok(written)
}
