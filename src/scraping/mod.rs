//! Polite retail scraping
//!
//! - `politeness`: robots.txt fetching, caching, and crawl-delay pacing
//! - `fetcher`: HTTP page fetching behind the `PageFetcher` trait
//! - `extractor`: product field extraction from fetched documents
//! - `crawler`: the search walk that ties the three together

pub mod crawler;
pub mod extractor;
pub mod fetcher;
pub mod politeness;

pub use crawler::SearchCrawler;
pub use extractor::ProductExtractor;
pub use fetcher::{ensure_ready, DocumentHandle, FetchError, HttpFetcher, PageFetcher};
pub use politeness::{ComplianceGate, RobotsPolicy};

/// Encode a search query for use in a URL path, with spaces as `+`
pub(crate) fn encode_query(query: &str) -> String {
    urlencoding::encode(query).replace("%20", "+")
}
