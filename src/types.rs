//! Core data types shared across the crate

use std::fmt;

/// Timestamp format for observations and history rows
pub const OBSERVED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Quality tier derived from a record's total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product observation from a crawl
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// Product title. Doubles as the identity key for dedup and history joins.
    pub title: String,
    /// Price in the shop currency
    pub price: f64,
    /// Star rating in [0, 5]; 0 means no rating was found
    pub rating: f64,
    /// Shipping label as shown on the page, "Standard" when absent
    pub shipping: String,
    /// Product page the record came from
    pub source_url: String,
    /// Local wall-clock time of the observation
    pub observed_at: String,
    /// Total score; 0 until scored
    pub score: f64,
    /// Tier derived from the score
    pub tier: Tier,
    /// 1..=3 for top picks, 0 for unranked
    pub rank: u32,
}

impl ProductRecord {
    /// Create a record observed now. Score, tier, and rank start unset.
    pub fn new(
        title: impl Into<String>,
        price: f64,
        rating: f64,
        shipping: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            price,
            rating,
            shipping: shipping.into(),
            source_url: source_url.into(),
            observed_at: chrono::Local::now().format(OBSERVED_AT_FORMAT).to_string(),
            score: 0.0,
            tier: Tier::Poor,
            rank: 0,
        }
    }

    /// Replace the observation timestamp
    pub fn with_observed_at(mut self, observed_at: impl Into<String>) -> Self {
        self.observed_at = observed_at.into();
        self
    }
}

/// A strict price drop between the stored snapshot and a fresh observation
#[derive(Debug, Clone, PartialEq)]
pub struct PriceDecreaseEvent {
    pub title: String,
    pub previous_price: f64,
    pub new_price: f64,
    pub url: String,
}

impl PriceDecreaseEvent {
    /// Absolute savings versus the stored price
    pub fn savings(&self) -> f64 {
        self.previous_price - self.new_price
    }

    /// Savings as a percentage of the stored price
    pub fn savings_percent(&self) -> f64 {
        self.savings() / self.previous_price * 100.0
    }
}

/// One row of the persisted price snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub title: String,
    pub last_price: f64,
    pub last_observed_at: String,
}

/// Outcome of a full analysis run: ranked top picks plus detected price drops
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub products: Vec<ProductRecord>,
    pub events: Vec<PriceDecreaseEvent>,
}
