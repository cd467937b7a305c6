//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! statistics about the latest stored run.

use crate::storage::{RunRecord, Storage};
use crate::CatalogError;
use std::collections::BTreeMap;

/// Latest-run statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// The run the statistics describe
    pub run: RunRecord,

    /// Rows stored for the run
    pub stored_books: u64,

    /// Mean price, `None` when nothing was stored
    pub average_price: Option<f64>,

    /// Row count per rating (0 = unrecognized)
    pub rating_distribution: BTreeMap<u8, u64>,

    /// Distinct categories
    pub categories: u64,
}

impl CrawlStatistics {
    /// Share of attempted items that produced a record, in percent
    pub fn success_rate(&self) -> f64 {
        if self.run.attempted == 0 {
            return 0.0;
        }
        (self.run.succeeded as f64 / self.run.attempted as f64) * 100.0
    }
}

/// Loads statistics for the most recent run
///
/// # Returns
///
/// * `Ok(None)` - The database holds no runs
/// * `Ok(Some(CrawlStatistics))` - Statistics of the latest run
pub fn load_statistics(storage: &dyn Storage) -> Result<Option<CrawlStatistics>, CatalogError> {
    let run = match storage.get_latest_run()? {
        Some(run) => run,
        None => return Ok(None),
    };

    let stored_books = storage.count_books(run.id)?;
    let average_price = storage.average_price(run.id)?;
    let rating_distribution = storage.rating_distribution(run.id)?;
    let categories = storage.count_categories(run.id)?;

    Ok(Some(CrawlStatistics {
        run,
        stored_books,
        average_price,
        rating_distribution,
        categories,
    }))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run {}:", stats.run.id);
    println!("  Status: {}", stats.run.status.to_db_string());
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", stats.run.config_hash);
    println!();

    println!("Items:");
    println!("  Attempted: {}", stats.run.attempted);
    println!("  Extracted: {}", stats.run.succeeded);
    println!("  Stored: {}", stats.stored_books);
    println!();

    match stats.average_price {
        Some(price) => println!("Average price: {:.2}", price),
        None => println!("Average price: n/a"),
    }
    println!("Categories: {}", stats.categories);
    println!();

    if !stats.rating_distribution.is_empty() {
        println!("Ratings:");
        for (rating, count) in stats.rating_distribution.iter().rev() {
            let label = if *rating == 0 {
                "unrated".to_string()
            } else {
                format!("{} star", rating)
            };
            println!("  {}: {}", label, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} items extracted)",
        stats.success_rate(),
        stats.run.succeeded,
        stats.run.attempted
    );
}
