//! Listing walker - lazy traversal of the paginated catalog listing
//!
//! The walker hands out detail-page URLs one at a time. A listing page is
//! fetched only once every URL of the previous page has been consumed, so
//! traversal stays in lockstep with the consumer.

use crate::crawler::document::{element_attr, resolve, select_within, CatalogSelectors, Document};
use crate::crawler::fetcher::Fetcher;
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Why the walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// The last listing page had no "next" link
    Exhausted,
    /// A listing page could not be fetched
    TransportFailure,
    /// The configured page limit was reached
    PageLimit,
    /// The "next" link pointed back to a page already walked
    Cycle,
    /// The cancellation token fired
    Cancelled,
}

/// Detail links and continuation found on one listing page
#[derive(Debug, Default)]
struct ListingPage {
    detail_urls: Vec<Url>,
    next_page: Option<Url>,
}

/// Walks listing pages and yields detail URLs in discovery order
///
/// Finite and non-restartable: once `next_url` returns `None` it keeps
/// returning `None`. Detail URLs are not deduplicated.
pub struct ListingWalker<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    selectors: &'a CatalogSelectors,
    next_page: Option<Url>,
    pending: VecDeque<Url>,
    visited: HashSet<Url>,
    pages_walked: u32,
    max_pages: Option<u32>,
    end: Option<WalkEnd>,
    token: CancellationToken,
}

impl<'a, F: Fetcher + ?Sized> ListingWalker<'a, F> {
    /// Creates a walker starting at `start_url`
    pub fn new(fetcher: &'a F, selectors: &'a CatalogSelectors, start_url: Url) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start_url.clone());

        Self {
            fetcher,
            selectors,
            next_page: Some(start_url),
            pending: VecDeque::new(),
            visited,
            pages_walked: 0,
            max_pages: None,
            end: None,
            token: CancellationToken::new(),
        }
    }

    /// Stops the walk after `max_pages` listing pages
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Checks `token` before every listing page fetch
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Number of listing pages fetched so far
    pub fn pages_walked(&self) -> u32 {
        self.pages_walked
    }

    /// Why the walk ended, once it has
    pub fn end(&self) -> Option<WalkEnd> {
        self.end
    }

    /// Returns the next detail URL, fetching listing pages as needed
    pub async fn next_url(&mut self) -> Option<Url> {
        loop {
            if let Some(url) = self.pending.pop_front() {
                return Some(url);
            }

            let page_url = self.next_page.take()?;

            if self.token.is_cancelled() {
                tracing::info!("Listing walk cancelled before {}", page_url);
                self.end = Some(WalkEnd::Cancelled);
                return None;
            }

            if let Some(max_pages) = self.max_pages {
                if self.pages_walked >= max_pages {
                    tracing::info!("Page limit of {} reached, stopping walk", max_pages);
                    self.end = Some(WalkEnd::PageLimit);
                    return None;
                }
            }

            let page_number = self.pages_walked + 1;
            tracing::info!("Collecting listing page {}: {}", page_number, page_url);

            let document = match self.fetcher.fetch(&page_url).await {
                Ok(document) => document,
                Err(e) => {
                    tracing::error!("Failed to fetch listing page {}: {}", page_url, e);
                    self.end = Some(WalkEnd::TransportFailure);
                    return None;
                }
            };
            self.pages_walked = page_number;

            let page = scan_listing(&document, self.selectors);
            tracing::debug!(
                "Listing page {} has {} items",
                page_number,
                page.detail_urls.len()
            );
            self.pending.extend(page.detail_urls);

            match page.next_page {
                Some(next) if self.visited.contains(&next) => {
                    tracing::warn!("Next link {} was already walked, stopping walk", next);
                    self.end = Some(WalkEnd::Cycle);
                }
                Some(next) => {
                    self.visited.insert(next.clone());
                    self.next_page = Some(next);
                }
                None => {
                    tracing::info!("No next link on page {}, end of listing", page_number);
                    self.end = Some(WalkEnd::Exhausted);
                }
            }
        }
    }
}

/// Reads item links and the next link from one listing page
///
/// Links resolve against the URL the page was served from.
fn scan_listing(document: &Document, selectors: &CatalogSelectors) -> ListingPage {
    let base = document.url();
    let mut page = ListingPage::default();

    for card in document.select_all(&selectors.listing_item) {
        let href = select_within(card, &selectors.detail_link).and_then(|link| element_attr(link, "href"));

        match href.map(|href| resolve(base, href)) {
            Some(Ok(url)) => page.detail_urls.push(url),
            Some(Err(e)) => tracing::warn!("Skipping item card on {}: bad link: {}", base, e),
            None => tracing::warn!("Skipping item card on {}: no detail link", base),
        }
    }

    page.next_page = document
        .select_first(&selectors.next_page)
        .and_then(|link| element_attr(link, "href"))
        .and_then(|href| match resolve(base, href) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Ignoring unparsable next link on {}: {}", base, e);
                None
            }
        });

    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::crawler::testing::{listing_page, StaticFetcher};

    const BASE: &str = "https://books.example.com/catalogue/";

    fn selectors() -> CatalogSelectors {
        CatalogSelectors::compile(&SelectorConfig::default()).unwrap()
    }

    fn url(path: &str) -> Url {
        Url::parse(BASE).unwrap().join(path).unwrap()
    }

    async fn collect(walker: &mut ListingWalker<'_, StaticFetcher>) -> Vec<String> {
        let mut urls = Vec::new();
        while let Some(url) = walker.next_url().await {
            urls.push(url.to_string());
        }
        urls
    }

    #[tokio::test]
    async fn test_walks_pages_in_order() {
        let fetcher = StaticFetcher::new()
            .with_page(url("page-1.html"), &listing_page(&["a/index.html", "b/index.html"], Some("page-2.html")))
            .with_page(url("page-2.html"), &listing_page(&["c/index.html"], None));
        let selectors = selectors();

        let mut walker = ListingWalker::new(&fetcher, &selectors, url("page-1.html"));
        let urls = collect(&mut walker).await;

        assert_eq!(
            urls,
            vec![
                format!("{}a/index.html", BASE),
                format!("{}b/index.html", BASE),
                format!("{}c/index.html", BASE),
            ]
        );
        assert_eq!(walker.pages_walked(), 2);
        assert_eq!(walker.end(), Some(WalkEnd::Exhausted));

        // Non-restartable
        assert!(walker.next_url().await.is_none());
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_listing_fetch_failure_ends_walk() {
        // page-2.html is not served
        let fetcher = StaticFetcher::new()
            .with_page(url("page-1.html"), &listing_page(&["a/index.html"], Some("page-2.html")));
        let selectors = selectors();

        let mut walker = ListingWalker::new(&fetcher, &selectors, url("page-1.html"));
        let urls = collect(&mut walker).await;

        assert_eq!(urls.len(), 1);
        assert_eq!(walker.pages_walked(), 1);
        assert_eq!(walker.end(), Some(WalkEnd::TransportFailure));
    }

    #[tokio::test]
    async fn test_duplicate_detail_urls_are_kept() {
        let fetcher = StaticFetcher::new().with_page(
            url("page-1.html"),
            &listing_page(&["a/index.html", "a/index.html"], None),
        );
        let selectors = selectors();

        let mut walker = ListingWalker::new(&fetcher, &selectors, url("page-1.html"));
        assert_eq!(collect(&mut walker).await.len(), 2);
    }

    #[tokio::test]
    async fn test_next_link_cycle_stops_walk() {
        let fetcher = StaticFetcher::new()
            .with_page(url("page-1.html"), &listing_page(&["a/index.html"], Some("page-2.html")))
            .with_page(url("page-2.html"), &listing_page(&["b/index.html"], Some("page-1.html")));
        let selectors = selectors();

        let mut walker = ListingWalker::new(&fetcher, &selectors, url("page-1.html"));
        let urls = collect(&mut walker).await;

        assert_eq!(urls.len(), 2);
        assert_eq!(walker.pages_walked(), 2);
        assert_eq!(walker.end(), Some(WalkEnd::Cycle));
    }

    #[tokio::test]
    async fn test_page_limit() {
        let fetcher = StaticFetcher::new()
            .with_page(url("page-1.html"), &listing_page(&["a/index.html"], Some("page-2.html")))
            .with_page(url("page-2.html"), &listing_page(&["b/index.html"], None));
        let selectors = selectors();

        let mut walker =
            ListingWalker::new(&fetcher, &selectors, url("page-1.html")).with_max_pages(Some(1));
        let urls = collect(&mut walker).await;

        assert_eq!(urls, vec![format!("{}a/index.html", BASE)]);
        assert_eq!(walker.end(), Some(WalkEnd::PageLimit));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let fetcher = StaticFetcher::new()
            .with_page(url("page-1.html"), &listing_page(&["a/index.html"], None));
        let selectors = selectors();
        let token = CancellationToken::new();
        token.cancel();

        let mut walker =
            ListingWalker::new(&fetcher, &selectors, url("page-1.html")).with_cancellation(token);

        assert!(walker.next_url().await.is_none());
        assert_eq!(walker.end(), Some(WalkEnd::Cancelled));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_card_without_link_is_skipped() {
        let body = r#"<html><body><ol>
            <li><article class="product_pod"><h3>No link here</h3></article></li>
            <li><article class="product_pod"><h3><a href="b/index.html">B</a></h3></article></li>
            </ol></body></html>"#;
        let fetcher = StaticFetcher::new().with_page(url("page-1.html"), body);
        let selectors = selectors();

        let mut walker = ListingWalker::new(&fetcher, &selectors, url("page-1.html"));
        assert_eq!(
            collect(&mut walker).await,
            vec![format!("{}b/index.html", BASE)]
        );
    }
}
