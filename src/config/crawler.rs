//! Crawl, politeness, and storage configuration sections

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Search crawl settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Base URL of the retailer search endpoint
    pub search_url_base: String,
    /// Substring that marks a product detail link
    pub product_link_marker: String,
    /// Result pages to walk per search
    pub max_pages: usize,
    /// Stop collecting once this many products are analyzed
    pub result_quota: usize,
    /// Candidate links considered per result page
    pub links_per_page: usize,
    /// Selector that must match before a result page counts as loaded
    pub search_ready_selector: String,
    /// Selector that must match before a product page counts as loaded
    pub product_ready_selector: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            search_url_base: "https://www.cdiscount.com/search/10".to_string(),
            product_link_marker: "/f-".to_string(),
            max_pages: 2,
            result_quota: 5,
            links_per_page: 10,
            search_ready_selector: "body".to_string(),
            product_ready_selector: "h1".to_string(),
        }
    }
}

/// robots.txt handling and request pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    /// User agent sent with every request and matched against robots.txt
    pub user_agent: String,
    /// Delay between requests when robots.txt declares none, in milliseconds
    pub default_delay_ms: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Number of per-host robots.txt policies kept in memory
    pub robots_cache_size: usize,
    /// How long a cached robots.txt policy stays fresh, in seconds
    pub robots_cache_ttl_secs: u64,
}

impl PolitenessConfig {
    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.default_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn robots_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.robots_cache_ttl_secs)
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_delay_ms: 2000,
            request_timeout_secs: 10,
            robots_cache_size: 64,
            robots_cache_ttl_secs: 86400,
        }
    }
}

/// On-disk data layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding all data files
    pub data_dir: PathBuf,
    /// Price history snapshot file name, inside `data_dir`
    pub history_file: String,
    /// Alert delivery settings file name, inside `data_dir`
    pub alerts_file: String,
}

impl StorageConfig {
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }

    pub fn alerts_path(&self) -> PathBuf {
        self.data_dir.join(&self.alerts_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            history_file: "price_history.csv".to_string(),
            alerts_file: "alerts.json".to_string(),
        }
    }
}
