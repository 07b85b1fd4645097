//! Search crawl
//!
//! Walks the retailer's paginated search results, collects candidate
//! product links, and analyzes each linked page. The walk is strictly
//! sequential: one request at a time, paced by the compliance gate.

use crate::config::CrawlerConfig;
use crate::scraping::encode_query;
use crate::scraping::extractor::ProductExtractor;
use crate::scraping::fetcher::{DocumentHandle, PageFetcher};
use crate::scraping::politeness::ComplianceGate;
use crate::types::ProductRecord;
use scraper::Selector;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

pub struct SearchCrawler<F: PageFetcher> {
    config: CrawlerConfig,
    gate: ComplianceGate,
    fetcher: F,
    extractor: ProductExtractor,
    link_selector: Option<Selector>,
}

impl<F: PageFetcher> SearchCrawler<F> {
    pub fn new(config: CrawlerConfig, gate: ComplianceGate, fetcher: F) -> Self {
        let pattern = format!("a[href*='{}']", config.product_link_marker);
        let link_selector = match Selector::parse(&pattern) {
            Ok(selector) => Some(selector),
            Err(_) => {
                warn!("Invalid product link selector: {}", pattern);
                None
            }
        };
        Self {
            config,
            gate,
            fetcher,
            extractor: ProductExtractor::new(),
            link_selector,
        }
    }

    /// Run a search and analyze products up to the configured quota
    ///
    /// A result page that fails to load ends the walk; whatever was
    /// collected so far is returned.
    pub async fn search(&mut self, query: &str, max_pages: usize) -> Vec<ProductRecord> {
        let root = format!(
            "{}/{}.html",
            self.config.search_url_base,
            encode_query(query)
        );
        let Ok(root_url) = Url::parse(&root) else {
            warn!("Search URL does not parse: {}", root);
            return Vec::new();
        };
        if !self.gate.is_allowed(&root_url).await {
            info!("robots.txt forbids searching {}", root_url);
            return Vec::new();
        }

        let quota = self.config.result_quota;
        let mut records: Vec<ProductRecord> = Vec::new();
        let mut seen_titles: HashSet<String> = HashSet::new();

        'pages: for page in 1..=max_pages {
            let page_url_str = format!("{}?page={}", root, page);
            let Ok(page_url) = Url::parse(&page_url_str) else {
                warn!("Page URL does not parse: {}", page_url_str);
                break;
            };

            let handle = match self
                .fetcher
                .fetch(&page_url, &self.config.search_ready_selector)
                .await
            {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Failed to load results page {}: {}", page, e);
                    break;
                }
            };
            let delay = self.gate.crawl_delay(&page_url).await;
            tokio::time::sleep(delay).await;

            let links = self.collect_links(&handle);
            debug!("Page {}: {} candidate links", page, links.len());

            for link in links {
                if records.len() >= quota {
                    break 'pages;
                }
                let delay = self.gate.crawl_delay(&link).await;
                tokio::time::sleep(delay).await;

                let Some(record) = self.analyze_link(&link).await else {
                    continue;
                };
                if seen_titles.contains(&record.title) {
                    debug!("Skipping duplicate listing: {}", record.title);
                    continue;
                }
                seen_titles.insert(record.title.clone());
                records.push(record);
            }

            if records.len() >= quota {
                break;
            }
        }

        info!("Search '{}' analyzed {} products", query, records.len());
        records
    }

    /// Candidate product links on a results page, deduplicated in
    /// encounter order
    fn collect_links(&self, handle: &DocumentHandle) -> Vec<Url> {
        let Some(selector) = self.link_selector.as_ref() else {
            return Vec::new();
        };
        let doc = handle.document();
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for element in doc.select(selector).take(self.config.links_per_page) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(mut url) = handle.url.join(href) else {
                continue;
            };
            url.set_fragment(None);
            if url.scheme() != "http" && url.scheme() != "https" {
                continue;
            }
            if seen.insert(url.to_string()) {
                links.push(url);
            }
        }
        links
    }

    /// Fetch and extract one product page; failures skip the link
    async fn analyze_link(&mut self, url: &Url) -> Option<ProductRecord> {
        if !self.gate.is_allowed(url).await {
            debug!("robots.txt forbids product page {}", url);
            return None;
        }
        let handle = match self
            .fetcher
            .fetch(url, &self.config.product_ready_selector)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to load product page {}: {}", url, e);
                return None;
            }
        };
        self.extractor.extract(&handle)
    }
}
