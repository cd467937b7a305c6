//! Field extraction for catalog detail pages
//!
//! Every field is read from the document, then passed through the rule
//! declared for it in `FIELD_RULES`:
//!
//! | Field              | Policy   | On failure                   |
//! |--------------------|----------|------------------------------|
//! | title              | required | item skipped                 |
//! | price              | required | item skipped                 |
//! | rating             | lenient  | 0                            |
//! | availability_count | lenient  | 0                            |
//! | category           | required | item skipped                 |
//! | image_url          | required | item skipped                 |
//!
//! Adding a field means adding a reader and a rule; the evaluation path is
//! shared.

use crate::crawler::document::{
    element_attr, element_text, resolve, CatalogSelectors, Document,
};
use crate::dataset::{Rating, Record};
use crate::CatalogError;
use regex::Regex;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Fields extracted from a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Price,
    Rating,
    AvailabilityCount,
    Category,
    ImageUrl,
}

impl Field {
    /// Column name of the field
    pub fn name(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::Rating => "rating",
            Self::AvailabilityCount => "availability_count",
            Self::Category => "category",
            Self::ImageUrl => "image_url",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a field reacts to a failed reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// The item is dropped when the field cannot be read
    Required,
    /// The field falls back to its default value
    Lenient,
}

/// Policy declaration for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: Field,
    pub policy: FieldPolicy,
}

/// Rules for every extracted field, in column order
pub const FIELD_RULES: [FieldRule; 6] = [
    FieldRule {
        field: Field::Title,
        policy: FieldPolicy::Required,
    },
    FieldRule {
        field: Field::Price,
        policy: FieldPolicy::Required,
    },
    FieldRule {
        field: Field::Rating,
        policy: FieldPolicy::Lenient,
    },
    FieldRule {
        field: Field::AvailabilityCount,
        policy: FieldPolicy::Lenient,
    },
    FieldRule {
        field: Field::Category,
        policy: FieldPolicy::Required,
    },
    FieldRule {
        field: Field::ImageUrl,
        policy: FieldPolicy::Required,
    },
];

/// Policy declared for `field`
pub fn policy_for(field: Field) -> FieldPolicy {
    FIELD_RULES
        .iter()
        .find(|rule| rule.field == field)
        .map(|rule| rule.policy)
        .unwrap_or(FieldPolicy::Required)
}

/// Why a detail page did not yield a record
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("missing field '{field}'")]
    MissingField { field: Field },

    #[error("malformed field '{field}': {reason} (got {value:?})")]
    MalformedField {
        field: Field,
        value: String,
        reason: String,
    },
}

impl ExtractionError {
    /// The field that failed
    pub fn field(&self) -> Field {
        match self {
            Self::MissingField { field } | Self::MalformedField { field, .. } => *field,
        }
    }
}

/// A failed reading, before the field's policy is applied
#[derive(Debug, Clone, PartialEq)]
enum Miss {
    Absent,
    Malformed { value: String, reason: String },
}

impl Miss {
    fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

type Reading<T> = Result<T, Miss>;

/// Applies the declared policy of `field` to a reading
fn evaluate<T: Default>(field: Field, reading: Reading<T>) -> Result<T, ExtractionError> {
    match (reading, policy_for(field)) {
        (Ok(value), _) => Ok(value),
        (Err(miss), FieldPolicy::Lenient) => {
            tracing::trace!("Field '{}' defaulted ({:?})", field, miss);
            Ok(T::default())
        }
        (Err(Miss::Absent), FieldPolicy::Required) => Err(ExtractionError::MissingField { field }),
        (Err(Miss::Malformed { value, reason }), FieldPolicy::Required) => {
            Err(ExtractionError::MalformedField {
                field,
                value,
                reason,
            })
        }
    }
}

/// Pulls and normalizes the record fields from a detail document
///
/// Pure: no I/O, no state beyond the compiled selectors and patterns.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    selectors: CatalogSelectors,
    availability_pattern: Regex,
    price_pattern: Regex,
}

impl FieldExtractor {
    pub fn new(selectors: CatalogSelectors) -> Result<Self, CatalogError> {
        Ok(Self {
            selectors,
            availability_pattern: Regex::new(r"\((\d+) available\)")?,
            price_pattern: Regex::new(r"^\d+(\.\d+)?$")?,
        })
    }

    /// Extracts one record from `document`
    ///
    /// Relative references are resolved against the URL the document was
    /// served from, like listing links. `detail_url` is kept as the record's
    /// provenance.
    pub fn extract(&self, document: &Document, detail_url: &Url) -> Result<Record, ExtractionError> {
        Ok(Record {
            title: evaluate(Field::Title, self.read_title(document))?,
            price: evaluate(Field::Price, self.read_price(document))?,
            rating: evaluate(Field::Rating, self.read_rating(document))?,
            availability_count: evaluate(
                Field::AvailabilityCount,
                self.read_availability(document),
            )?,
            category: evaluate(Field::Category, self.read_category(document))?,
            image_url: evaluate(Field::ImageUrl, self.read_image_url(document))?,
            source_url: detail_url.clone(),
        })
    }

    fn read_title(&self, document: &Document) -> Reading<String> {
        let element = document.select_first(&self.selectors.title).ok_or(Miss::Absent)?;
        let title = element_text(element).trim().to_string();
        if title.is_empty() {
            return Err(Miss::malformed(title, "empty title"));
        }
        Ok(title)
    }

    fn read_price(&self, document: &Document) -> Reading<f64> {
        let element = document.select_first(&self.selectors.price).ok_or(Miss::Absent)?;
        parse_price(&element_text(element), &self.price_pattern)
    }

    fn read_rating(&self, document: &Document) -> Reading<Rating> {
        let element = document.select_first(&self.selectors.rating).ok_or(Miss::Absent)?;
        let class = element_attr(element, "class").unwrap_or_default();
        let label = rating_token(class).ok_or_else(|| Miss::malformed(class, "no rating token"))?;
        match Rating::from_label(label) {
            Rating::UNRECOGNIZED => Err(Miss::malformed(label, "unknown rating label")),
            rating => Ok(rating),
        }
    }

    fn read_availability(&self, document: &Document) -> Reading<u32> {
        let element = document
            .select_first(&self.selectors.availability)
            .ok_or(Miss::Absent)?;
        let text = collapse_whitespace(&element_text(element));
        let captures = self
            .availability_pattern
            .captures(&text)
            .ok_or_else(|| Miss::malformed(text.as_str(), "no available count"))?;
        captures[1]
            .parse::<u32>()
            .map_err(|e| Miss::malformed(&captures[1], e.to_string()))
    }

    fn read_category(&self, document: &Document) -> Reading<String> {
        let link = document
            .select_all(&self.selectors.breadcrumb)
            .nth(2)
            .ok_or(Miss::Absent)?;
        let category = element_text(link).trim().to_string();
        if category.is_empty() {
            return Err(Miss::malformed(category, "empty breadcrumb entry"));
        }
        Ok(category)
    }

    fn read_image_url(&self, document: &Document) -> Reading<String> {
        let image = document
            .select_first(&self.selectors.gallery_image)
            .ok_or(Miss::Absent)?;
        let src = element_attr(image, "src").ok_or(Miss::Absent)?;
        let resolved = resolve(document.url(), src).map_err(|e| Miss::malformed(src, e.to_string()))?;
        match resolved.scheme() {
            "http" | "https" => Ok(resolved.into()),
            other => Err(Miss::malformed(src, format!("unsupported scheme '{}'", other))),
        }
    }
}

/// Parses a price such as `£51.77` into a non-negative amount
///
/// Only currency symbols and whitespace may precede the digits; what is left
/// must match `pattern` (plain decimal notation).
fn parse_price(text: &str, pattern: &Regex) -> Reading<f64> {
    let trimmed = text.trim();
    let amount = trimmed.trim_start_matches(is_currency_prefix).trim_end();

    if !pattern.is_match(amount) {
        return Err(Miss::malformed(trimmed, "not a decimal amount"));
    }

    let price: f64 = amount
        .parse()
        .map_err(|_| Miss::malformed(trimmed, "not a decimal amount"))?;

    if !price.is_finite() {
        return Err(Miss::malformed(trimmed, "price must be a finite amount"));
    }
    Ok(price)
}

/// Currency signs, plus the `Â` left over when `£` is decoded as Latin-1
fn is_currency_prefix(c: char) -> bool {
    c.is_whitespace() || matches!(c, '£' | '$' | '€' | '¥' | 'Â')
}

/// The class token following `star-rating`, or the second token otherwise
fn rating_token(class: &str) -> Option<&str> {
    let tokens: Vec<&str> = class.split_whitespace().collect();
    let index = tokens
        .iter()
        .position(|token| *token == "star-rating")
        .map_or(1, |position| position + 1);
    tokens.get(index).copied()
}

/// Collapses runs of whitespace into single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;

    const DETAIL_URL: &str =
        "https://books.example.com/catalogue/a-light-in-the-attic_1000/index.html";

    fn extractor() -> FieldExtractor {
        let selectors = CatalogSelectors::compile(&SelectorConfig::default()).unwrap();
        FieldExtractor::new(selectors).unwrap()
    }

    struct Page<'a> {
        title: Option<&'a str>,
        price: Option<&'a str>,
        rating_class: Option<&'a str>,
        availability: Option<&'a str>,
        breadcrumb: Option<Vec<&'a str>>,
        image_src: Option<&'a str>,
    }

    impl Default for Page<'_> {
        fn default() -> Self {
            Self {
                title: Some("A Light in the Attic"),
                price: Some("£51.77"),
                rating_class: Some("star-rating Three"),
                availability: Some("\n    In stock (22 available)\n  "),
                breadcrumb: Some(vec!["Home", "Books", "Poetry"]),
                image_src: Some("../../media/cache/fe/72/cover.jpg"),
            }
        }
    }

    impl Page<'_> {
        fn render(&self) -> String {
            let mut html = String::from("<html><body>");
            if let Some(crumbs) = &self.breadcrumb {
                html.push_str(r#"<ul class="breadcrumb">"#);
                for crumb in crumbs {
                    html.push_str(&format!(r##"<li><a href="#">{}</a></li>"##, crumb));
                }
                html.push_str(&format!("<li class=\"active\">{}</li></ul>", self.title.unwrap_or("")));
            }
            if let Some(src) = self.image_src {
                html.push_str(&format!(
                    r#"<div id="product_gallery"><div class="item"><img src="{}" alt="cover"/></div></div>"#,
                    src
                ));
            }
            html.push_str(r#"<div class="product_main">"#);
            if let Some(title) = self.title {
                html.push_str(&format!("<h1>{}</h1>", title));
            }
            if let Some(price) = self.price {
                html.push_str(&format!(r#"<p class="price_color">{}</p>"#, price));
            }
            if let Some(availability) = self.availability {
                html.push_str(&format!(
                    r#"<p class="instock availability"><i class="icon-ok"></i>{}</p>"#,
                    availability
                ));
            }
            if let Some(class) = self.rating_class {
                html.push_str(&format!(r#"<p class="{}"><i class="icon-star"></i></p>"#, class));
            }
            html.push_str("</div></body></html>");
            html
        }

        fn extract(&self) -> Result<Record, ExtractionError> {
            let url = Url::parse(DETAIL_URL).unwrap();
            let document = Document::parse(url.clone(), &self.render());
            extractor().extract(&document, &url)
        }
    }

    #[test]
    fn test_extract_complete_page() {
        let record = Page::default().extract().unwrap();

        assert_eq!(record.title, "A Light in the Attic");
        assert_eq!(record.price, 51.77);
        assert_eq!(record.rating.value(), 3);
        assert_eq!(record.availability_count, 22);
        assert_eq!(record.category, "Poetry");
        assert_eq!(
            record.image_url,
            "https://books.example.com/media/cache/fe/72/cover.jpg"
        );
        assert_eq!(record.source_url.as_str(), DETAIL_URL);
    }

    #[test]
    fn test_missing_title() {
        let page = Page {
            title: None,
            ..Page::default()
        };
        assert_eq!(
            page.extract().unwrap_err(),
            ExtractionError::MissingField { field: Field::Title }
        );
    }

    #[test]
    fn test_malformed_price() {
        let page = Page {
            price: Some("£call us"),
            ..Page::default()
        };
        let error = page.extract().unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::MalformedField {
                field: Field::Price,
                ..
            }
        ));
    }

    fn price(text: &str) -> Reading<f64> {
        parse_price(text, &extractor().price_pattern)
    }

    #[test]
    fn test_price_currency_variants() {
        assert_eq!(price("£51.77").unwrap(), 51.77);
        assert_eq!(price("  $ 12.50 ").unwrap(), 12.5);
        assert_eq!(price("Â£0.00").unwrap(), 0.0);
        assert_eq!(price("€7").unwrap(), 7.0);
        assert_eq!(price("13").unwrap(), 13.0);
        assert!(price("£-3.00").is_err());
        assert!(price("").is_err());
        assert!(price("£").is_err());
        assert!(price("£12.3.4").is_err());
    }

    #[test]
    fn test_price_rejects_text_and_other_notations() {
        for text in ["Price on request 15", "abc 0.5", "1e3", "£+7", "£12 GBP", "inf"] {
            assert!(
                matches!(price(text), Err(Miss::Malformed { .. })),
                "{:?} should be malformed",
                text
            );
        }
    }

    #[test]
    fn test_prose_price_is_malformed_field() {
        let page = Page {
            price: Some("Price on request 15"),
            ..Page::default()
        };
        assert!(matches!(
            page.extract().unwrap_err(),
            ExtractionError::MalformedField {
                field: Field::Price,
                ..
            }
        ));
    }

    #[test]
    fn test_blank_title_is_malformed() {
        let page = Page {
            title: Some("  "),
            ..Page::default()
        };
        assert!(matches!(
            page.extract().unwrap_err(),
            ExtractionError::MalformedField {
                field: Field::Title,
                ..
            }
        ));
    }

    #[test]
    fn test_blank_breadcrumb_entry_is_malformed() {
        let page = Page {
            breadcrumb: Some(vec!["Home", "Books", " "]),
            ..Page::default()
        };
        assert!(matches!(
            page.extract().unwrap_err(),
            ExtractionError::MalformedField {
                field: Field::Category,
                ..
            }
        ));
    }

    #[test]
    fn test_rating_reads_token_after_star_rating() {
        let page = Page {
            rating_class: Some("star-rating Zero Three"),
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap().rating.value(), 0);

        let page = Page {
            rating_class: Some("large star-rating Four"),
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap().rating.value(), 4);
    }

    #[test]
    fn test_image_resolves_against_served_url() {
        let requested = Url::parse(DETAIL_URL).unwrap();
        let served =
            Url::parse("https://books.example.com/catalogue/v2/a-light-in-the-attic_1000/index.html")
                .unwrap();
        let document = Document::parse(served, &Page::default().render());

        let record = extractor().extract(&document, &requested).unwrap();
        assert_eq!(
            record.image_url,
            "https://books.example.com/catalogue/media/cache/fe/72/cover.jpg"
        );
        assert_eq!(record.source_url, requested);
    }

    #[test]
    fn test_rating_three() {
        let record = Page::default().extract().unwrap();
        assert_eq!(record.rating, Rating::from_label("Three"));
    }

    #[test]
    fn test_unrecognized_rating_defaults_to_zero() {
        let page = Page {
            rating_class: Some("star-rating Zero"),
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap().rating.value(), 0);
    }

    #[test]
    fn test_missing_rating_node_defaults_to_zero() {
        let page = Page {
            rating_class: None,
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap().rating.value(), 0);
    }

    #[test]
    fn test_availability_with_count() {
        let page = Page {
            availability: Some("In stock (7 available)"),
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap().availability_count, 7);
    }

    #[test]
    fn test_availability_without_count() {
        let page = Page {
            availability: Some("In stock"),
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap().availability_count, 0);
    }

    #[test]
    fn test_availability_missing_node() {
        let page = Page {
            availability: None,
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap().availability_count, 0);
    }

    #[test]
    fn test_missing_breadcrumb() {
        let page = Page {
            breadcrumb: None,
            ..Page::default()
        };
        assert_eq!(
            page.extract().unwrap_err(),
            ExtractionError::MissingField {
                field: Field::Category
            }
        );
    }

    #[test]
    fn test_short_breadcrumb() {
        let page = Page {
            breadcrumb: Some(vec!["Home", "Books"]),
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap_err().field(), Field::Category);
    }

    #[test]
    fn test_missing_gallery() {
        let page = Page {
            image_src: None,
            ..Page::default()
        };
        assert_eq!(
            page.extract().unwrap_err(),
            ExtractionError::MissingField {
                field: Field::ImageUrl
            }
        );
    }

    #[test]
    fn test_absolute_image_src_kept() {
        let page = Page {
            image_src: Some("https://cdn.example.org/cover.jpg"),
            ..Page::default()
        };
        assert_eq!(
            page.extract().unwrap().image_url,
            "https://cdn.example.org/cover.jpg"
        );
    }

    #[test]
    fn test_non_http_image_is_malformed() {
        let page = Page {
            image_src: Some("data:image/png;base64,AAAA"),
            ..Page::default()
        };
        assert_eq!(page.extract().unwrap_err().field(), Field::ImageUrl);
    }

    #[test]
    fn test_rules_cover_every_field() {
        let fields: Vec<Field> = FIELD_RULES.iter().map(|rule| rule.field).collect();
        assert_eq!(
            fields,
            vec![
                Field::Title,
                Field::Price,
                Field::Rating,
                Field::AvailabilityCount,
                Field::Category,
                Field::ImageUrl,
            ]
        );
        assert_eq!(policy_for(Field::Rating), FieldPolicy::Lenient);
        assert_eq!(policy_for(Field::AvailabilityCount), FieldPolicy::Lenient);
        assert_eq!(policy_for(Field::Category), FieldPolicy::Required);
    }
}
