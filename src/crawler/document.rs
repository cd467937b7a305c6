//! Parsed HTML documents and the compiled selector set
//!
//! Lookups return `Option`: `None` means the node does not exist, while a
//! node that exists with empty text yields `Some` of an empty string.

use crate::config::SelectorConfig;
use crate::CatalogError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A fetched and parsed HTML page
pub struct Document {
    url: Url,
    html: Html,
}

impl Document {
    /// Parses `body` as the document found at `url`
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            html: Html::parse_document(body),
        }
    }

    /// URL the document was served from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// First element matching `selector`, if any
    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    /// All elements matching `selector`, in document order
    pub fn select_all<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> {
        self.html.select(selector)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("url", &self.url.as_str()).finish()
    }
}

/// Concatenated text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Attribute value of an element
pub fn element_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// First element matching `selector` inside `element`
pub fn select_within<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

/// Resolves `href` against `base`
///
/// Absolute references are returned unchanged.
pub fn resolve(base: &Url, href: &str) -> Result<Url, url::ParseError> {
    base.join(href.trim())
}

/// Compiled form of `SelectorConfig`
#[derive(Debug, Clone)]
pub struct CatalogSelectors {
    pub listing_item: Selector,
    pub detail_link: Selector,
    pub next_page: Selector,
    pub title: Selector,
    pub price: Selector,
    pub rating: Selector,
    pub availability: Selector,
    pub breadcrumb: Selector,
    pub gallery_image: Selector,
}

impl CatalogSelectors {
    /// Compiles every configured selector
    pub fn compile(config: &SelectorConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            listing_item: compile(&config.listing_item)?,
            detail_link: compile(&config.detail_link)?,
            next_page: compile(&config.next_page)?,
            title: compile(&config.title)?,
            price: compile(&config.price)?,
            rating: compile(&config.rating)?,
            availability: compile(&config.availability)?,
            breadcrumb: compile(&config.breadcrumb)?,
            gallery_image: compile(&config.gallery_image)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, CatalogError> {
    Selector::parse(selector).map_err(|e| CatalogError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}
