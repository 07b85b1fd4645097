//! Page fetching
//!
//! `PageFetcher` is the boundary between the crawl logic and the network.
//! The production implementation is `HttpFetcher`; tests substitute canned
//! fetchers that serve documents from memory.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

use crate::config::PolitenessConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Invalid readiness selector: {0}")]
    InvalidSelector(String),

    #[error("Page never became ready: no match for {0}")]
    NotReady(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// A fetched page: the final URL after redirects plus its raw HTML
///
/// Parsed documents are not `Send`, so the handle stores the source text
/// and parses on demand inside synchronous scopes.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    pub url: Url,
    html: String,
    pub fetch_duration: Duration,
}

impl DocumentHandle {
    pub fn from_html(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
            fetch_duration: Duration::ZERO,
        }
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    pub fn has_match(&self, selector: &Selector) -> bool {
        self.document().select(selector).next().is_some()
    }
}

/// Check that the page's ready marker is present
///
/// `PageFetcher` implementations call this after retrieving a document.
pub fn ensure_ready(handle: &DocumentHandle, ready_selector: &str) -> Result<(), FetchError> {
    let selector = Selector::parse(ready_selector)
        .map_err(|_| FetchError::InvalidSelector(ready_selector.to_string()))?;
    if handle.has_match(&selector) {
        Ok(())
    } else {
        Err(FetchError::NotReady(ready_selector.to_string()))
    }
}

/// Fetches a page and confirms it is ready for extraction
#[async_trait]
pub trait PageFetcher {
    async fn fetch(&self, url: &Url, ready_selector: &str) -> Result<DocumentHandle, FetchError>;
}

/// HTTP-backed fetcher used in production
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &PolitenessConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, ready_selector: &str) -> Result<DocumentHandle, FetchError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let start = Instant::now();
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let html = response.text().await?;
        let mut handle = DocumentHandle::from_html(final_url, html);
        handle.fetch_duration = start.elapsed();

        ensure_ready(&handle, ready_selector)?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(html: &str) -> DocumentHandle {
        let url = Url::parse("https://shop.test/f-item-1.html").unwrap();
        DocumentHandle::from_html(url, html)
    }

    #[test]
    fn test_document_parses_and_selects() {
        let h = handle("<html><body><h1>Washing Machine</h1></body></html>");
        let doc = h.document();
        let sel = Selector::parse("h1").unwrap();
        let title: String = doc.select(&sel).next().unwrap().text().collect();
        assert_eq!(title, "Washing Machine");
    }

    #[test]
    fn test_ensure_ready_passes_when_marker_present() {
        let h = handle("<html><body><h1>ok</h1></body></html>");
        assert!(ensure_ready(&h, "h1").is_ok());
    }

    #[test]
    fn test_ensure_ready_fails_when_marker_missing() {
        let h = handle("<html><body><p>loading</p></body></html>");
        match ensure_ready(&h, "h1") {
            Err(FetchError::NotReady(sel)) => assert_eq!(sel, "h1"),
            other => panic!("expected NotReady, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_ready_rejects_bad_selector() {
        let h = handle("<html><body></body></html>");
        assert!(matches!(
            ensure_ready(&h, "h1[["),
            Err(FetchError::InvalidSelector(_))
        ));
    }
}
