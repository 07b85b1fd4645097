//! robots.txt compliance and request pacing
//!
//! Every URL passes through the `ComplianceGate` before it is fetched.
//! Policies are fetched once per host, cached with a TTL, and re-fetched
//! when stale. A host whose robots.txt cannot be retrieved is treated as
//! allowing everything.

use crate::config::PolitenessConfig;
use lru::LruCache;
use reqwest::Client;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Longest Crawl-delay honored from robots.txt, in seconds
const MAX_DECLARED_DELAY_SECS: f64 = 86_400.0;

/// Parsed robots.txt rules for one host, scoped to our user agent
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    disallow_patterns: Vec<String>,
    allow_patterns: Vec<String>,
    crawl_delay: Option<Duration>,
    fetched_at: Instant,
    ttl: Duration,
}

impl RobotsPolicy {
    /// Parse robots.txt content, keeping the rule group that best matches
    /// `user_agent`
    pub fn new(robots_txt: &str, user_agent: &str, ttl: Duration) -> Self {
        let (disallow_patterns, allow_patterns, crawl_delay) =
            parse_robots(robots_txt, user_agent);
        Self {
            disallow_patterns,
            allow_patterns,
            crawl_delay,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    /// Policy with no restrictions, used when robots.txt is unreachable
    pub fn allow_all(ttl: Duration) -> Self {
        Self {
            disallow_patterns: Vec::new(),
            allow_patterns: Vec::new(),
            crawl_delay: None,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.ttl
    }

    /// Whether this path may be fetched
    ///
    /// The longest matching pattern decides; an Allow rule wins a tie
    /// against a Disallow rule of the same length.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest_match = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| path_matches(path, p))
                .map(|p| p.len())
                .max()
        };
        let allow = longest_match(&self.allow_patterns);
        let disallow = longest_match(&self.disallow_patterns);
        match (allow, disallow) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(d)) => a >= d,
        }
    }

    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
    }
}

/// Extract the Disallow/Allow/Crawl-delay rules that apply to `user_agent`
///
/// A group addressed to our specific agent replaces any rules collected
/// from a `*` group.
fn parse_robots(content: &str, user_agent: &str) -> (Vec<String>, Vec<String>, Option<Duration>) {
    let ua_lower = user_agent.to_lowercase();
    let mut disallow = Vec::new();
    let mut allow = Vec::new();
    let mut crawl_delay = None;
    let mut applies = false;
    let mut found_specific_agent = false;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                let agent = value.to_lowercase();
                if agent == "*" {
                    applies = !found_specific_agent;
                } else if ua_lower.contains(&agent) {
                    if !found_specific_agent {
                        // First specific match supersedes wildcard rules
                        disallow.clear();
                        allow.clear();
                        crawl_delay = None;
                        found_specific_agent = true;
                    }
                    applies = true;
                } else {
                    applies = false;
                }
            }
            "disallow" if applies => {
                if !value.is_empty() {
                    disallow.push(value.to_string());
                }
            }
            "allow" if applies => {
                if !value.is_empty() {
                    allow.push(value.to_string());
                }
            }
            "crawl-delay" if applies => {
                if let Ok(secs) = value.parse::<f64>() {
                    if (0.0..=MAX_DECLARED_DELAY_SECS).contains(&secs) {
                        crawl_delay = Some(Duration::from_secs_f64(secs));
                    }
                }
            }
            _ => {}
        }
    }

    (disallow, allow, crawl_delay)
}

/// Match a URL path against a robots.txt pattern with `*` and `$` support
fn path_matches(path: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let (pattern, must_end) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.split('*').collect();
        let mut pos = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if i == 0 {
                if !path.starts_with(part) {
                    return false;
                }
                pos = part.len();
            } else {
                match path[pos..].find(part) {
                    Some(found) => pos = pos + found + part.len(),
                    None => return false,
                }
            }
        }
        if must_end {
            // The final literal part must reach the end of the path
            parts.last().map_or(true, |p| p.is_empty()) || pos == path.len()
        } else {
            true
        }
    } else if must_end {
        path == pattern
    } else {
        path.starts_with(pattern)
    }
}

/// Gatekeeper all outbound requests pass through
pub struct ComplianceGate {
    config: PolitenessConfig,
    robots_cache: LruCache<String, RobotsPolicy>,
    http_client: Client,
}

impl ComplianceGate {
    pub fn new(config: &PolitenessConfig) -> Self {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_default();
        let cache_capacity = NonZeroUsize::new(config.robots_cache_size.max(1))
            .expect("robots_cache_size.max(1) guarantees non-zero");
        Self {
            config: config.clone(),
            robots_cache: LruCache::new(cache_capacity),
            http_client,
        }
    }

    /// Whether robots.txt permits fetching this URL
    pub async fn is_allowed(&mut self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return true;
        };
        let host = host.to_string();
        let policy = self.policy_for(url.scheme(), &host).await;
        let allowed = policy.is_allowed(url.path());
        if !allowed {
            debug!("robots.txt disallows {}", url);
        }
        allowed
    }

    /// Delay to respect before fetching from this URL's host
    pub async fn crawl_delay(&mut self, url: &Url) -> Duration {
        let Some(host) = url.host_str() else {
            return self.config.default_delay();
        };
        let host = host.to_string();
        let policy = self.policy_for(url.scheme(), &host).await;
        policy.crawl_delay().unwrap_or_else(|| self.config.default_delay())
    }

    /// Seed the cache with a policy for a host, replacing any cached entry
    pub fn cache_policy(&mut self, host: &str, policy: RobotsPolicy) {
        self.robots_cache.put(host.to_string(), policy);
    }

    async fn policy_for(&mut self, scheme: &str, host: &str) -> RobotsPolicy {
        if let Some(policy) = self.robots_cache.get(host) {
            if !policy.is_expired() {
                return policy.clone();
            }
        }

        let robots_url = format!("{}://{}/robots.txt", scheme, host);
        let ttl = self.config.robots_cache_ttl();
        let policy = match self.fetch_robots(&robots_url).await {
            Ok(content) => RobotsPolicy::new(&content, &self.config.user_agent, ttl),
            Err(e) => {
                warn!("Failed to fetch {}: {}", robots_url, e);
                RobotsPolicy::allow_all(ttl)
            }
        };
        self.robots_cache.put(host.to_string(), policy.clone());
        policy
    }

    async fn fetch_robots(&self, robots_url: &str) -> Result<String, reqwest::Error> {
        let response = self.http_client.get(robots_url).send().await?;
        if !response.status().is_success() {
            // Missing robots.txt means no restrictions
            return Ok(String::new());
        }
        response.text().await
    }
}
