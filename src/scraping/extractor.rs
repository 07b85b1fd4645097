//! Product field extraction
//!
//! Pulls title, price, rating, and shipping out of a fetched product page.
//! Title and price are required; a page missing either yields no record.
//! Rating and shipping degrade to neutral defaults.

use crate::scraping::fetcher::DocumentHandle;
use crate::types::ProductRecord;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Price selectors in priority order
const PRICE_SELECTORS: [&str; 4] = [
    "span[itemprop='price']",
    ".price",
    ".prdtPrice",
    "span.sc-e4stwg-1",
];

/// Rating selectors, tried as one group
const RATING_SELECTOR: &str = "span.ratingValue, .ac_rating";

/// Marker word that identifies a shipping label
const SHIPPING_KEYWORD: &str = "Livraison";

/// Longest shipping label kept on a record
const SHIPPING_LABEL_MAX_CHARS: usize = 50;

/// Shipping label used when the page shows none
const DEFAULT_SHIPPING: &str = "Standard";

/// Extracts product fields from fetched documents
///
/// Selectors are compiled once at construction; any that fail to parse
/// are silently dropped from their strategy list.
pub struct ProductExtractor {
    title_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    rating_selectors: Vec<Selector>,
    any_element: Option<Selector>,
    decimal: Option<Regex>,
}

impl ProductExtractor {
    pub fn new() -> Self {
        let title_selectors = ["h1"]
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();
        let price_selectors = PRICE_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();
        let rating_selectors = [RATING_SELECTOR]
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();
        Self {
            title_selectors,
            price_selectors,
            rating_selectors,
            any_element: Selector::parse("*").ok(),
            decimal: Regex::new(r"\d+\.?\d*").ok(),
        }
    }

    /// Extract a product record from a fetched page
    ///
    /// Returns `None` when the page has no title or no positive price.
    pub fn extract(&self, handle: &DocumentHandle) -> Option<ProductRecord> {
        let doc = handle.document();

        let Some(title) = self.extract_title(&doc) else {
            debug!("No title found on {}", handle.url);
            return None;
        };
        let Some(price) = self.extract_price(&doc) else {
            debug!("No usable price found on {}", handle.url);
            return None;
        };
        let rating = self.extract_rating(&doc);
        let shipping = self.extract_shipping(&doc);

        Some(ProductRecord::new(
            title,
            price,
            rating,
            shipping,
            handle.url.to_string(),
        ))
    }

    fn extract_title(&self, doc: &Html) -> Option<String> {
        for selector in &self.title_selectors {
            if let Some(element) = doc.select(selector).next() {
                let title = element_text(&element);
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }
        None
    }

    /// Try each price strategy in order
    ///
    /// Within a strategy the first element whose text carries a digit
    /// decides; a strategy only wins with a value above zero.
    fn extract_price(&self, doc: &Html) -> Option<f64> {
        let decimal = self.decimal.as_ref()?;
        for selector in &self.price_selectors {
            let candidate = doc
                .select(selector)
                .map(|el| element_text(&el))
                .find(|text| text.chars().any(|c| c.is_ascii_digit()))
                .and_then(|text| parse_price(decimal, &text));
            if let Some(price) = candidate {
                if price > 0.0 {
                    return Some(price);
                }
            }
        }
        None
    }

    /// Rating out of 5, or 0.0 when the page shows none
    fn extract_rating(&self, doc: &Html) -> f64 {
        let Some(decimal) = self.decimal.as_ref() else {
            return 0.0;
        };
        for selector in &self.rating_selectors {
            if let Some(element) = doc.select(selector).next() {
                let text = element_text(&element).replace(',', ".");
                if let Some(m) = decimal.find(&text) {
                    if let Ok(value) = m.as_str().parse::<f64>() {
                        return value.clamp(0.0, 5.0);
                    }
                }
                return 0.0;
            }
        }
        0.0
    }

    /// First element whose own text mentions the shipping keyword
    fn extract_shipping(&self, doc: &Html) -> String {
        let Some(any) = self.any_element.as_ref() else {
            return DEFAULT_SHIPPING.to_string();
        };
        for element in doc.select(any) {
            let direct_mention = element
                .children()
                .filter_map(|child| child.value().as_text())
                .any(|text| text.contains(SHIPPING_KEYWORD));
            if direct_mention {
                return element_text(&element)
                    .chars()
                    .take(SHIPPING_LABEL_MAX_CHARS)
                    .collect();
            }
        }
        DEFAULT_SHIPPING.to_string()
    }
}

impl Default for ProductExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Element text with whitespace collapsed
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a price out of raw element text
///
/// Strips everything but digits and separators, normalizes the decimal
/// comma, then takes the first decimal run.
fn parse_price(decimal: &Regex, text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let normalized = cleaned.replace(',', ".");
    decimal
        .find(&normalized)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
