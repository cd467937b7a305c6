//! Dataset assembly
//!
//! Turns the ordered records of a crawl into the column-ordered, id-stamped
//! table handed to the persistence sinks. No I/O happens here.

use crate::dataset::record::Record;
use serde::Serialize;

/// One row of the final dataset
///
/// Field order is the column order of every sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRow {
    /// 1-based position in crawl order
    pub id: u32,
    pub title: String,
    pub price: f64,
    pub rating: u8,
    pub availability_count: u32,
    pub category: String,
    pub image_url: String,
}

/// Column-ordered, id-stamped record collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Column names in persisted order
    pub const COLUMNS: [&'static str; 7] = [
        "id",
        "title",
        "price",
        "rating",
        "availability_count",
        "category",
        "image_url",
    ];

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<DatasetRow> {
        self.rows
    }
}

impl From<Vec<DatasetRow>> for Dataset {
    fn from(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }
}

/// Assembles records into a dataset
///
/// Every record gets `id = position + 1` in input order, regardless of any
/// identifier the source markup may have carried. An empty input yields an
/// empty dataset; deciding whether that is a failure is the caller's job.
pub fn assemble<I>(records: I) -> Dataset
where
    I: IntoIterator<Item = Record>,
{
    let rows = records
        .into_iter()
        .enumerate()
        .map(|(position, record)| DatasetRow {
            id: position as u32 + 1,
            title: record.title,
            price: record.price,
            rating: record.rating.value(),
            availability_count: record.availability_count,
            category: record.category,
            image_url: record.image_url,
        })
        .collect();

    Dataset { rows }
}
