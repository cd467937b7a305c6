//! Catalog record definitions

use std::fmt;
use url::Url;

/// Star rating of a catalog item
///
/// `0` means the rating indicator was present but its word was not one of
/// the recognized labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Rating(u8);

impl Rating {
    /// Rating used when the label is missing or unrecognized
    pub const UNRECOGNIZED: Rating = Rating(0);

    /// Maps a rating label ("One" .. "Five") to its value
    ///
    /// Any other token maps to `Rating::UNRECOGNIZED`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "One" => Rating(1),
            "Two" => Rating(2),
            "Three" => Rating(3),
            "Four" => Rating(4),
            "Five" => Rating(5),
            _ => Self::UNRECOGNIZED,
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog item extracted from a detail page
///
/// Only fully normalized records are ever constructed; an item that fails
/// any required field never becomes a `Record`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub title: String,

    /// Amount with the currency symbol stripped, always >= 0
    pub price: f64,

    pub rating: Rating,

    /// Count parsed out of the availability phrase (0 when absent)
    pub availability_count: u32,

    /// Second breadcrumb level below the root
    pub category: String,

    /// Absolute (http/https) cover image URL
    pub image_url: String,

    /// Detail page the record was extracted from
    pub source_url: Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_labels() {
        assert_eq!(Rating::from_label("One").value(), 1);
        assert_eq!(Rating::from_label("Two").value(), 2);
        assert_eq!(Rating::from_label("Three").value(), 3);
        assert_eq!(Rating::from_label("Four").value(), 4);
        assert_eq!(Rating::from_label("Five").value(), 5);
    }

    #[test]
    fn test_unrecognized_rating_is_zero() {
        assert_eq!(Rating::from_label("Zero"), Rating::UNRECOGNIZED);
        assert_eq!(Rating::from_label("three"), Rating::UNRECOGNIZED);
        assert_eq!(Rating::from_label(""), Rating::UNRECOGNIZED);
        assert_eq!(Rating::default().value(), 0);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::from_label("Four").to_string(), "4");
    }
}
