//! SQLite dataset sink
//!
//! Stores the dataset rows under the current run id of a storage backend.

use crate::dataset::Dataset;
use crate::output::traits::{DatasetSink, OutputResult};
use crate::storage::Storage;

/// Writes the dataset into the `books` table of one run
pub struct SqliteSink<'a> {
    storage: &'a mut dyn Storage,
    run_id: i64,
}

impl<'a> SqliteSink<'a> {
    pub fn new(storage: &'a mut dyn Storage, run_id: i64) -> Self {
        Self { storage, run_id }
    }
}

impl DatasetSink for SqliteSink<'_> {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn persist(&mut self, dataset: &Dataset) -> OutputResult<usize> {
        let written = self.storage.insert_books(self.run_id, dataset.rows())?;
        tracing::info!("Stored {} rows under run {}", written, self.run_id);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetRow;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_persist_into_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h").unwrap();
        let dataset = Dataset::from(vec![DatasetRow {
            id: 1,
            title: "Soumission".to_string(),
            price: 50.10,
            rating: 1,
            availability_count: 20,
            category: "Fiction".to_string(),
            image_url: "https://books.example.com/media/s.jpg".to_string(),
        }]);

        let written = SqliteSink::new(&mut storage, run_id)
            .persist(&dataset)
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(storage.load_books(run_id).unwrap(), dataset.into_rows());
    }

    #[test]
    fn test_persist_into_missing_run_fails() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let dataset = Dataset::from(vec![DatasetRow {
            id: 1,
            title: "t".to_string(),
            price: 1.0,
            rating: 1,
            availability_count: 0,
            category: "c".to_string(),
            image_url: "https://x/".to_string(),
        }]);

        assert!(SqliteSink::new(&mut storage, 99).persist(&dataset).is_err());
    }
}
