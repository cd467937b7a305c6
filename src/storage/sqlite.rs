//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::dataset::DatasetRow;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::CatalogError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, attempted, succeeded";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database file at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let attempted: i64 = row.get(5)?;
    let succeeded: i64 = row.get(6)?;
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Interrupted),
        attempted: attempted.max(0) as u64,
        succeeded: succeeded.max(0) as u64,
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<DatasetRow> {
    Ok(DatasetRow {
        id: row.get(0)?,
        title: row.get(1)?,
        price: row.get(2)?,
        rating: row.get(3)?,
        availability_count: row.get(4)?,
        category: row.get(5)?,
        image_url: row.get(6)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        attempted: u64,
        succeeded: u64,
    ) -> StorageResult<()> {
        let run = self.get_run(run_id)?;
        if run.status != RunStatus::Running {
            return Err(StorageError::RunFinished(run_id));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, attempted = ?3, succeeded = ?4 WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                attempted as i64,
                succeeded as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    // ===== Dataset =====

    fn insert_books(&mut self, run_id: i64, rows: &[DatasetRow]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO books (run_id, id, title, price, rating, availability_count, category, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for row in rows {
                stmt.execute(params![
                    run_id,
                    row.id,
                    row.title,
                    row.price,
                    row.rating,
                    row.availability_count,
                    row.category,
                    row.image_url,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Stored {} rows for run {}", rows.len(), run_id);
        Ok(rows.len())
    }

    fn load_books(&self, run_id: i64) -> StorageResult<Vec<DatasetRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, price, rating, availability_count, category, image_url
             FROM books WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count_books(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM books WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Statistics =====

    fn average_price(&self, run_id: i64) -> StorageResult<Option<f64>> {
        let average: Option<f64> = self.conn.query_row(
            "SELECT AVG(price) FROM books WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(average)
    }

    fn rating_distribution(&self, run_id: i64) -> StorageResult<BTreeMap<u8, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT rating, COUNT(*) FROM books WHERE run_id = ?1 GROUP BY rating",
        )?;

        let mut distribution = BTreeMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (rating, count) = row?;
            let rating = u8::try_from(rating).map_err(|_| StorageError::CorruptRow {
                table: "books",
                message: format!("rating {} out of range", rating),
            })?;
            distribution.insert(rating, count as u64);
        }

        Ok(distribution)
    }

    fn count_categories(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT category) FROM books WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
