//! Configuration types and loading

mod crawler;
mod logging;

pub use crawler::{CrawlerConfig, PolitenessConfig, StorageConfig};
pub use logging::{LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for all outbound requests
pub const DEFAULT_USER_AGENT: &str = "PriceWatchBot/1.0 (+https://github.com/pricewatch/pricewatch)";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search crawl settings
    #[serde(default)]
    pub crawler: CrawlerConfig,
    /// robots.txt handling and request pacing
    #[serde(default)]
    pub politeness: PolitenessConfig,
    /// On-disk data layout
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values, reporting every violation at once
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if url::Url::parse(&self.crawler.search_url_base).is_err() {
            errors.push(format!(
                "crawler.search_url_base is not a valid URL: {}",
                self.crawler.search_url_base
            ));
        }
        if self.crawler.product_link_marker.is_empty() {
            errors.push("crawler.product_link_marker must not be empty".to_string());
        }
        if self.crawler.max_pages == 0 {
            errors.push("crawler.max_pages must be at least 1".to_string());
        }
        if self.crawler.result_quota == 0 {
            errors.push("crawler.result_quota must be at least 1".to_string());
        }
        if self.crawler.links_per_page == 0 {
            errors.push("crawler.links_per_page must be at least 1".to_string());
        }
        if self.crawler.search_ready_selector.is_empty() {
            errors.push("crawler.search_ready_selector must not be empty".to_string());
        }
        if self.crawler.product_ready_selector.is_empty() {
            errors.push("crawler.product_ready_selector must not be empty".to_string());
        }

        if self.politeness.user_agent.is_empty() {
            errors.push("politeness.user_agent must not be empty".to_string());
        }
        if self.politeness.request_timeout_secs == 0 {
            errors.push("politeness.request_timeout_secs must be at least 1".to_string());
        }
        if self.politeness.robots_cache_size == 0 {
            errors.push("politeness.robots_cache_size must be at least 1".to_string());
        }

        if self.storage.history_file.is_empty() {
            errors.push("storage.history_file must not be empty".to_string());
        }
        if self.storage.alerts_file.is_empty() {
            errors.push("storage.alerts_file must not be empty".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration validation failed:\n  - {}", errors.join("\n  - "));
        }
        Ok(())
    }
}
