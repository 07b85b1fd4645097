//! End-to-end analysis run
//!
//! One run: crawl the search results, score what was found, keep the top
//! picks, reconcile them against the price history, and send alerts for
//! any decreases. `run_with` takes the fetcher and alert sink as inputs
//! so the whole pipeline can run against canned pages.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::history::HistoryStore;
use crate::notify::{self, AlertConfig, AlertSink, LogSink};
use crate::scoring;
use crate::scraping::{ComplianceGate, HttpFetcher, PageFetcher, SearchCrawler};
use crate::types::RunResult;

/// How many ranked products a run keeps and persists
pub const TOP_PICKS: usize = 3;

/// Run a full analysis against the live site
pub async fn run_analysis(query: &str, config: &Config) -> Result<RunResult> {
    let fetcher = HttpFetcher::new(&config.politeness).context("Failed to set up page fetcher")?;
    let gate = ComplianceGate::new(&config.politeness);
    run_with(query, config, gate, fetcher, &LogSink).await
}

/// Run a full analysis with the given fetcher and alert sink
pub async fn run_with<F: PageFetcher>(
    query: &str,
    config: &Config,
    gate: ComplianceGate,
    fetcher: F,
    sink: &dyn AlertSink,
) -> Result<RunResult> {
    let mut crawler = SearchCrawler::new(config.crawler.clone(), gate, fetcher);
    let mut records = crawler.search(query, config.crawler.max_pages).await;

    scoring::apply(&mut records);
    scoring::rank_top(&mut records, TOP_PICKS);
    records.truncate(TOP_PICKS);

    // A run that found nothing leaves the history untouched
    let events = if records.is_empty() {
        Vec::new()
    } else {
        let store = HistoryStore::new(config.storage.history_path());
        store.reconcile(&records)
    };

    let alert_config = AlertConfig::load(config.storage.alerts_path());
    let delivered = notify::send_alerts(&events, &alert_config, sink);

    info!(
        "Run complete: {} top pick(s), {} decrease(s), alerts {}",
        records.len(),
        events.len(),
        if delivered { "sent" } else { "not sent" }
    );

    Ok(RunResult {
        products: records,
        events,
    })
}
