//! Polite retail price watcher
//!
//! Searches a retailer for a product query, analyzes the listed products,
//! and tracks their prices over time:
//!
//! - robots.txt compliance and crawl-delay pacing on every request
//! - Product extraction: title, price, rating, shipping
//! - Composite scoring with quality tiers and a ranked top three
//! - CSV price history with decrease detection
//! - Alert rendering for price drops

pub mod config;
pub mod history;
pub mod notify;
pub mod pipeline;
pub mod scoring;
pub mod scraping;
pub mod types;

pub use config::Config;
pub use pipeline::run_analysis;
pub use types::{HistoryEntry, PriceDecreaseEvent, ProductRecord, RunResult, Tier};
