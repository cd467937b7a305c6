use serde::Deserialize;

/// Main configuration structure for Catalog-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First listing page of the catalog
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Upper bound on listing pages walked (unbounded when absent)
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
///
/// At least one of the two destinations must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Path to the CSV export
    #[serde(rename = "csv-path", default)]
    pub csv_path: Option<String>,
}

/// CSS selectors describing the catalog markup
///
/// Every key falls back to the layout of the reference catalog site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One card per item on a listing page
    #[serde(rename = "listing-item")]
    pub listing_item: String,

    /// Detail link inside a card
    #[serde(rename = "detail-link")]
    pub detail_link: String,

    /// "next page" link on a listing page
    #[serde(rename = "next-page")]
    pub next_page: String,

    pub title: String,

    pub price: String,

    /// Element whose class list carries the rating word
    pub rating: String,

    pub availability: String,

    /// Links of the breadcrumb trail, root first
    pub breadcrumb: String,

    /// Image inside the gallery container
    #[serde(rename = "gallery-image")]
    pub gallery_image: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_item: "article.product_pod".to_string(),
            detail_link: "h3 a".to_string(),
            next_page: "li.next a".to_string(),
            title: "h1".to_string(),
            price: "p.price_color".to_string(),
            rating: "p.star-rating".to_string(),
            availability: "p.instock.availability".to_string(),
            breadcrumb: "ul.breadcrumb a".to_string(),
            gallery_image: "div#product_gallery img".to_string(),
        }
    }
}

impl SelectorConfig {
    /// Returns every selector paired with its config key
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("listing-item", self.listing_item.as_str()),
            ("detail-link", self.detail_link.as_str()),
            ("next-page", self.next_page.as_str()),
            ("title", self.title.as_str()),
            ("price", self.price.as_str()),
            ("rating", self.rating.as_str()),
            ("availability", self.availability.as_str()),
            ("breadcrumb", self.breadcrumb.as_str()),
            ("gallery-image", self.gallery_image.as_str()),
        ]
    }
}
