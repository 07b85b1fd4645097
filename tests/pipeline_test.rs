//! End-to-end pipeline tests against canned pages
//!
//! Each test runs the full analysis pipeline with an in-memory fetcher
//! and a pre-seeded robots.txt policy, so nothing touches the network.

use async_trait::async_trait;
use pricewatch::config::Config;
use pricewatch::notify::{AlertConfig, AlertSink};
use pricewatch::pipeline::run_with;
use pricewatch::scraping::{
    ensure_ready, ComplianceGate, DocumentHandle, FetchError, PageFetcher, RobotsPolicy,
};
use pricewatch::types::Tier;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

const TTL: Duration = Duration::from_secs(3600);

/// Serves pages from memory and counts fetches
#[derive(Clone)]
struct CannedFetcher {
    pages: Arc<HashMap<String, String>>,
    fetches: Arc<AtomicUsize>,
}

impl CannedFetcher {
    fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages: Arc::new(pages),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for CannedFetcher {
    async fn fetch(&self, url: &Url, ready_selector: &str) -> Result<DocumentHandle, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let html = self
            .pages
            .get(url.as_str())
            .ok_or(FetchError::Status(404))?;
        let handle = DocumentHandle::from_html(url.clone(), html.clone());
        ensure_ready(&handle, ready_selector)?;
        Ok(handle)
    }
}

/// Captures whatever was delivered
struct RecordingSink {
    delivered: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl AlertSink for RecordingSink {
    fn deliver(&self, subject: &str, body: &str, _config: &AlertConfig) -> bool {
        self.delivered
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        true
    }
}

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.search_url_base = "https://shop.test/search/10".to_string();
    config.crawler.max_pages = 1;
    config.politeness.default_delay_ms = 0;
    config.storage.data_dir = dir.path().join("data");
    config
}

fn open_gate(config: &Config) -> ComplianceGate {
    let mut gate = ComplianceGate::new(&config.politeness);
    gate.cache_policy("shop.test", RobotsPolicy::allow_all(TTL));
    gate
}

fn closed_gate(config: &Config) -> ComplianceGate {
    let mut gate = ComplianceGate::new(&config.politeness);
    let robots = "User-agent: *\nDisallow: /\n";
    gate.cache_policy(
        "shop.test",
        RobotsPolicy::new(robots, &config.politeness.user_agent, TTL),
    );
    gate
}

fn results_page(hrefs: &[&str]) -> String {
    let links: String = hrefs
        .iter()
        .map(|h| format!(r#"<a href="{}">item</a>"#, h))
        .collect();
    format!(
        "<html><body><div class='results'>{}</div></body></html>",
        links
    )
}

fn product_page(title: &str, price: &str, rating: &str, shipping: &str) -> String {
    format!(
        r#"<html><body>
            <h1>{}</h1>
            <span itemprop="price">{} €</span>
            <span class="ratingValue">{}</span>
            <p>{}</p>
        </body></html>"#,
        title, price, rating, shipping
    )
}

fn shop_pages(price: &str) -> HashMap<String, String> {
    let mut pages = HashMap::new();
    pages.insert(
        "https://shop.test/search/10/lave+linge.html?page=1".to_string(),
        results_page(&["/f-lave-linge-1.html"]),
    );
    pages.insert(
        "https://shop.test/f-lave-linge-1.html".to_string(),
        product_page("Lave-linge 8kg", price, "4,5", "Livraison gratuite"),
    );
    pages
}

#[tokio::test]
async fn test_run_detects_price_drop_across_runs() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    AlertConfig {
        sender_email: Some("watch@example.com".to_string()),
        app_password: Some("hunter2".to_string()),
        recipient_email: Some("me@example.com".to_string()),
    }
    .save(config.storage.alerts_path())
    .unwrap();
    let sink = RecordingSink::new();

    // First run establishes the baseline
    let fetcher = CannedFetcher::new(shop_pages("250,00"));
    let first = run_with("lave linge", &config, open_gate(&config), fetcher, &sink)
        .await
        .unwrap();

    assert_eq!(first.products.len(), 1);
    assert_eq!(first.products[0].title, "Lave-linge 8kg");
    assert_eq!(first.products[0].price, 250.0);
    // 4.0 price + 3.0 rating + 2.0 shipping
    assert_eq!(first.products[0].score, 9.0);
    assert_eq!(first.products[0].tier, Tier::Excellent);
    assert_eq!(first.products[0].rank, 1);
    assert!(first.events.is_empty());
    assert_eq!(sink.count(), 0);

    // Second run sees the lower price
    let fetcher = CannedFetcher::new(shop_pages("220,00"));
    let second = run_with("lave linge", &config, open_gate(&config), fetcher, &sink)
        .await
        .unwrap();

    assert_eq!(second.events.len(), 1);
    assert_eq!(second.events[0].title, "Lave-linge 8kg");
    assert_eq!(second.events[0].previous_price, 250.0);
    assert_eq!(second.events[0].new_price, 220.0);

    assert_eq!(sink.count(), 1);
    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered[0].0, "Price alert: 1 decrease(s) detected");
    assert!(delivered[0].1.contains("250.00 EUR -> 220.00 EUR"));
}

#[tokio::test]
async fn test_blocked_site_yields_empty_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let fetcher = CannedFetcher::new(shop_pages("250,00"));
    let sink = RecordingSink::new();

    let result = run_with(
        "lave linge",
        &config,
        closed_gate(&config),
        fetcher.clone(),
        &sink,
    )
    .await
    .unwrap();

    assert!(result.products.is_empty());
    assert!(result.events.is_empty());
    assert_eq!(fetcher.fetch_count(), 0);
    assert!(!config.storage.history_path().exists());
}

#[tokio::test]
async fn test_run_keeps_ranked_top_three() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut pages = HashMap::new();
    pages.insert(
        "https://shop.test/search/10/tv.html?page=1".to_string(),
        results_page(&[
            "/f-tv-1.html",
            "/f-tv-2.html",
            "/f-tv-3.html",
            "/f-tv-4.html",
        ]),
    );
    // Scores: 6.0, 10.0, 2.0, 5.0
    pages.insert(
        "https://shop.test/f-tv-1.html".to_string(),
        product_page("TV A", "250,00", "3,5", "Standard"),
    );
    pages.insert(
        "https://shop.test/f-tv-2.html".to_string(),
        product_page("TV B", "150,00", "4,8", "Livraison gratuite"),
    );
    pages.insert(
        "https://shop.test/f-tv-3.html".to_string(),
        product_page("TV C", "650,00", "2,0", "Standard"),
    );
    pages.insert(
        "https://shop.test/f-tv-4.html".to_string(),
        product_page("TV D", "450,00", "3,0", "Livraison express"),
    );
    let fetcher = CannedFetcher::new(pages);
    let sink = RecordingSink::new();

    let result = run_with("tv", &config, open_gate(&config), fetcher.clone(), &sink)
        .await
        .unwrap();

    // 1 results page + 4 product pages
    assert_eq!(fetcher.fetch_count(), 5);

    assert_eq!(result.products.len(), 3);
    assert_eq!(result.products[0].title, "TV B");
    assert_eq!(result.products[0].rank, 1);
    assert_eq!(result.products[1].title, "TV A");
    assert_eq!(result.products[1].rank, 2);
    assert_eq!(result.products[2].title, "TV D");
    assert_eq!(result.products[2].rank, 3);
    assert!(result.products[0].score >= result.products[1].score);
    assert!(result.products[1].score >= result.products[2].score);

    // Only the kept picks reach the history
    let content = std::fs::read_to_string(config.storage.history_path()).unwrap();
    assert!(content.contains("TV B"));
    assert!(!content.contains("TV C"));
}

#[tokio::test]
async fn test_empty_run_preserves_history() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let sink = RecordingSink::new();

    let fetcher = CannedFetcher::new(shop_pages("250,00"));
    run_with("lave linge", &config, open_gate(&config), fetcher, &sink)
        .await
        .unwrap();
    let baseline = std::fs::read_to_string(config.storage.history_path()).unwrap();

    // A blocked run finds nothing and must not clear the baseline
    let fetcher = CannedFetcher::new(HashMap::new());
    let result = run_with("lave linge", &config, closed_gate(&config), fetcher, &sink)
        .await
        .unwrap();

    assert!(result.products.is_empty());
    let after = std::fs::read_to_string(config.storage.history_path()).unwrap();
    assert_eq!(baseline, after);
}

#[tokio::test]
async fn test_decrease_without_alert_settings_is_still_reported() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let sink = RecordingSink::new();

    let fetcher = CannedFetcher::new(shop_pages("250,00"));
    run_with("lave linge", &config, open_gate(&config), fetcher, &sink)
        .await
        .unwrap();

    let fetcher = CannedFetcher::new(shop_pages("220,00"));
    let result = run_with("lave linge", &config, open_gate(&config), fetcher, &sink)
        .await
        .unwrap();

    // The event is in the result even though nothing was delivered
    assert_eq!(result.events.len(), 1);
    assert_eq!(sink.count(), 0);
}
