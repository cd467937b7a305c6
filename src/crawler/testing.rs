//! In-memory fetcher and page builders for crawler unit tests

use crate::crawler::document::Document;
use crate::crawler::fetcher::{Fetcher, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Serves fixed bodies by URL; unknown URLs answer 404
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<Url, String>,
    requests: Mutex<Vec<Url>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: Url, body: &str) -> Self {
        self.pages.insert(url, body.to_string());
        self
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<Document, TransportError> {
        self.requests.lock().unwrap().push(url.clone());
        match self.pages.get(url) {
            Some(body) => Ok(Document::parse(url.clone(), body)),
            None => Err(TransportError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Listing page with one product card per href and an optional next link
pub fn listing_page(hrefs: &[&str], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><ol class=\"row\">");
    for href in hrefs {
        html.push_str(&format!(
            r#"<li><article class="product_pod"><h3><a href="{}" title="t">t</a></h3></article></li>"#,
            href
        ));
    }
    html.push_str("</ol>");
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<ul class="pager"><li class="next"><a href="{}">next</a></li></ul>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Detail page carrying every extracted field
pub fn detail_page(title: &str, price: &str, rating: &str, availability: &str) -> String {
    format!(
        r##"<html><body>
        <ul class="breadcrumb">
            <li><a href="#">Home</a></li>
            <li><a href="#">Books</a></li>
            <li><a href="#">Poetry</a></li>
            <li class="active">{title}</li>
        </ul>
        <div id="product_gallery"><div class="item"><img src="../../media/cover.jpg" alt="{title}"/></div></div>
        <div class="product_main">
            <h1>{title}</h1>
            <p class="price_color">{price}</p>
            <p class="instock availability"><i class="icon-ok"></i> {availability} </p>
            <p class="star-rating {rating}"><i class="icon-star"></i></p>
        </div>
        </body></html>"##,
        title = title,
        price = price,
        rating = rating,
        availability = availability,
    )
}
