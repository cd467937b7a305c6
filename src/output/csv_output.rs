//! CSV dataset sink

use crate::dataset::Dataset;
use crate::output::traits::{DatasetSink, OutputResult};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes the dataset to a CSV file with a header row
///
/// The file is replaced on every persist.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn persist(&mut self, dataset: &Dataset) -> OutputResult<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer.write_record(Dataset::COLUMNS)?;
        for row in dataset.iter() {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} rows to {}", dataset.len(), self.path.display());
        Ok(dataset.len())
    }
}
