//! Storage module for persisting crawl runs and their datasets
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Run tracking with attempted/succeeded counters
//! - Dataset row persistence and reload

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::CatalogError;
use std::path::Path;

/// Opens (or creates) the storage database at `path`
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CatalogError> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub attempted: u64,
    pub succeeded: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    /// Finished without collecting a single record
    Empty,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Empty => "empty",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "empty" => Some(Self::Empty),
            _ => None,
        }
    }
}
