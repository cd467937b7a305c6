//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator drives the listing walker, fetches every detail page in
//! discovery order, runs the field extractor on it and accumulates the
//! records that came out whole. Per-item failures are logged and counted;
//! they never abort the run.

use crate::config::Config;
use crate::crawler::document::CatalogSelectors;
use crate::crawler::extractor::{Field, FieldExtractor};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::listing::{ListingWalker, WalkEnd};
use crate::dataset::Record;
use crate::CatalogError;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What happened to one attempted item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Extracted,
    FetchFailed { reason: String },
    ExtractionFailed { field: Field, reason: String },
}

/// Notification sent to the observer after every attempted item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// 1-based attempt number
    pub position: u64,
    pub url: Url,
    pub status: ItemStatus,
}

/// Callback invoked once per attempted item
pub type ItemObserver = Box<dyn FnMut(&ItemOutcome) + Send>;

/// In-memory output of one coordinator run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlResult {
    /// Successfully extracted records, in discovery order
    pub records: Vec<Record>,

    /// Detail pages attempted
    pub attempted: u64,

    /// Detail pages that produced a record
    pub succeeded: u64,

    /// Listing pages fetched
    pub pages_walked: u32,

    /// Why the listing walk ended (`None` if the run stopped first)
    pub walk_end: Option<WalkEnd>,

    /// True when the run stopped because the token was cancelled
    pub cancelled: bool,
}

impl CrawlResult {
    /// Attempted items that produced nothing
    pub fn failed(&self) -> u64 {
        self.attempted - self.succeeded
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<F: Fetcher> {
    fetcher: F,
    selectors: CatalogSelectors,
    extractor: FieldExtractor,
    start_url: Url,
    max_pages: Option<u32>,
    observer: Option<ItemObserver>,
}

impl<F: Fetcher> Coordinator<F> {
    /// Creates a coordinator that starts walking at `start_url`
    pub fn new(fetcher: F, start_url: Url, selectors: CatalogSelectors) -> Result<Self, CatalogError> {
        let extractor = FieldExtractor::new(selectors.clone())?;
        Ok(Self {
            fetcher,
            selectors,
            extractor,
            start_url,
            max_pages: None,
            observer: None,
        })
    }

    /// Creates a coordinator from the crawler and selector configuration
    pub fn from_config(fetcher: F, config: &Config) -> Result<Self, CatalogError> {
        let start_url = Url::parse(&config.crawler.start_url)?;
        let selectors = CatalogSelectors::compile(&config.selectors)?;
        Ok(Self::new(fetcher, start_url, selectors)?.with_max_pages(config.crawler.max_pages))
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Registers a callback invoked after every attempted item
    pub fn with_observer(mut self, observer: ItemObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Runs one complete crawl
    ///
    /// Strictly sequential: one listing or detail fetch at a time. The token
    /// is checked before every fetch; once cancelled, the records gathered so
    /// far are returned. Nothing in here returns an error: failures show up
    /// only as `attempted - succeeded`.
    pub async fn run(&mut self, token: &CancellationToken) -> CrawlResult {
        tracing::info!("Starting crawl at {}", self.start_url);
        let start_time = Instant::now();

        let mut result = CrawlResult::default();
        let mut walker = ListingWalker::new(&self.fetcher, &self.selectors, self.start_url.clone())
            .with_max_pages(self.max_pages)
            .with_cancellation(token.clone());

        loop {
            if token.is_cancelled() {
                tracing::warn!("Crawl cancelled after {} items", result.attempted);
                result.cancelled = true;
                break;
            }

            let url = match walker.next_url().await {
                Some(url) => url,
                None => break,
            };

            result.attempted += 1;
            tracing::debug!("Processing item {}: {}", result.attempted, url);

            let status = match self.fetcher.fetch(&url).await {
                Err(e) => {
                    tracing::warn!("Skipping {}: fetch failed: {}", url, e);
                    ItemStatus::FetchFailed {
                        reason: e.to_string(),
                    }
                }
                Ok(document) => match self.extractor.extract(&document, &url) {
                    Ok(record) => {
                        result.records.push(record);
                        result.succeeded += 1;
                        ItemStatus::Extracted
                    }
                    Err(e) => {
                        tracing::warn!("Skipping {}: field '{}': {}", url, e.field(), e);
                        ItemStatus::ExtractionFailed {
                            field: e.field(),
                            reason: e.to_string(),
                        }
                    }
                },
            };

            if let Some(observer) = self.observer.as_mut() {
                observer(&ItemOutcome {
                    position: result.attempted,
                    url,
                    status,
                });
            }

            if result.attempted % 10 == 0 {
                let elapsed = start_time.elapsed();
                tracing::info!(
                    "Progress: {} items attempted, {} extracted, {:.2} items/sec",
                    result.attempted,
                    result.succeeded,
                    result.attempted as f64 / elapsed.as_secs_f64()
                );
            }
        }

        result.pages_walked = walker.pages_walked();
        result.walk_end = walker.end();
        if result.walk_end == Some(WalkEnd::Cancelled) {
            result.cancelled = true;
        }

        tracing::info!(
            "Crawl finished: {} of {} items extracted from {} listing pages in {:?}",
            result.succeeded,
            result.attempted,
            result.pages_walked,
            start_time.elapsed()
        );

        result
    }
}
