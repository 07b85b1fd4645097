//! Price history persistence
//!
//! The history is a single CSV snapshot of the last observed price per
//! product. Each run compares fresh records against the snapshot, emits
//! decrease events, then overwrites the snapshot with the fresh records.
//! Storage trouble never fails a run; it degrades to an empty history.

use crate::types::{HistoryEntry, PriceDecreaseEvent, ProductRecord};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const HEADER: [&str; 3] = ["title", "price", "observed_at"];

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current snapshot, skipping rows that do not parse
    ///
    /// A missing or unreadable file reads as an empty history.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let mut reader = match csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
        {
            Ok(reader) => reader,
            Err(e) => {
                debug!("No readable history at {:?}: {}", self.path, e);
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    debug!("Skipping unreadable history row: {}", e);
                    continue;
                }
            };
            let Some(title) = row.get(0) else {
                continue;
            };
            let Ok(last_price) = row.get(1).unwrap_or("").parse::<f64>() else {
                debug!("Skipping history row with bad price: {}", title);
                continue;
            };
            entries.push(HistoryEntry {
                title: title.to_string(),
                last_price,
                last_observed_at: row.get(2).unwrap_or("").to_string(),
            });
        }
        entries
    }

    /// Compare fresh records against the snapshot and replace it
    ///
    /// Returns one event per product whose price strictly dropped, in the
    /// order the records were passed. A failed write is logged and the
    /// events are still returned.
    pub fn reconcile(&self, records: &[ProductRecord]) -> Vec<PriceDecreaseEvent> {
        let mut previous: HashMap<String, f64> = HashMap::new();
        for entry in self.entries() {
            previous.insert(entry.title, entry.last_price);
        }

        let mut events = Vec::new();
        for record in records {
            if let Some(&last_price) = previous.get(&record.title) {
                if record.price < last_price {
                    events.push(PriceDecreaseEvent {
                        title: record.title.clone(),
                        previous_price: last_price,
                        new_price: record.price,
                        url: record.source_url.clone(),
                    });
                }
            }
        }

        if let Err(e) = self.persist(records) {
            warn!("Failed to write history snapshot: {}", e);
        }
        events
    }

    /// Write the snapshot through a temp file and rename it into place
    fn persist(&self, records: &[ProductRecord]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        writer.write_record(HEADER)?;
        for record in records {
            let price = format!("{:.2}", record.price);
            writer.write_record([
                record.title.as_str(),
                price.as_str(),
                record.observed_at.as_str(),
            ])?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
