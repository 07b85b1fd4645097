//! Price drop alerts
//!
//! Alert delivery settings live in a small JSON file next to the history
//! snapshot. Delivery itself sits behind `AlertSink` so the pipeline never
//! depends on a live mail account; the default sink writes the alert to
//! the log.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::PriceDecreaseEvent;

/// Longest product title rendered in an alert body
const ALERT_TITLE_MAX_CHARS: usize = 100;

/// Alert delivery settings, stored as JSON with camelCase keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertConfig {
    pub sender_email: Option<String>,
    pub app_password: Option<String>,
    pub recipient_email: Option<String>,
}

impl AlertConfig {
    /// Load settings, falling back to empty settings on any trouble
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                debug!("No alert settings at {:?}", path);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Alert settings at {:?} are unreadable: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to encode alert settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write alert settings to {:?}", path))?;
        Ok(())
    }

    /// Whether sender, password, and recipient are all present
    pub fn is_complete(&self) -> bool {
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        filled(&self.sender_email) && filled(&self.app_password) && filled(&self.recipient_email)
    }
}

/// Subject line for a batch of decrease events
pub fn alert_subject(events: &[PriceDecreaseEvent]) -> String {
    format!("Price alert: {} decrease(s) detected", events.len())
}

/// Plain-text alert body, one block per decrease
pub fn format_alerts(events: &[PriceDecreaseEvent]) -> String {
    let mut body = String::new();
    for event in events {
        let title: String = event.title.chars().take(ALERT_TITLE_MAX_CHARS).collect();
        body.push_str(&format!(
            "Price drop: {}\n  {:.2} EUR -> {:.2} EUR (save {:.2} EUR, -{:.1}%)\n  {}\n\n",
            title,
            event.previous_price,
            event.new_price,
            event.savings(),
            event.savings_percent(),
            event.url,
        ));
    }
    body
}

/// Delivers a rendered alert somewhere
pub trait AlertSink {
    fn deliver(&self, subject: &str, body: &str, config: &AlertConfig) -> bool;
}

/// Writes alerts to the log instead of sending them anywhere
pub struct LogSink;

impl AlertSink for LogSink {
    fn deliver(&self, subject: &str, body: &str, config: &AlertConfig) -> bool {
        let Some(recipient) = config.recipient_email.as_deref() else {
            return false;
        };
        info!("Alert for {}: {}\n{}", recipient, subject, body);
        true
    }
}

/// Render and deliver alerts for the run's decrease events
///
/// Returns whether anything was delivered. No events or incomplete
/// settings skip delivery quietly.
pub fn send_alerts(
    events: &[PriceDecreaseEvent],
    config: &AlertConfig,
    sink: &dyn AlertSink,
) -> bool {
    if events.is_empty() {
        debug!("No price decreases, no alert to send");
        return false;
    }
    if !config.is_complete() {
        warn!(
            "Alert delivery not configured; {} decrease(s) go unreported",
            events.len()
        );
        return false;
    }
    let subject = alert_subject(events);
    let body = format_alerts(events);
    sink.deliver(&subject, &body, config)
}
