//! Change detection for a single channel.
//!
//! Pulls the recency window from the fetch adapter, drops what the ledger has
//! already seen, records the rest and hands each newly recorded item to the
//! notifier. Only the winner of `insert_if_absent` notifies, so an item is
//! announced at most once no matter how many cycles overlap.
//!
//! The window is `items_per_source` deep. A channel that uploads more than that
//! between two cycles loses the overflow; nothing here tries to page back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::WatchConfig;
use crate::error::{DetectError, FetchError, StorageError};
use crate::fetch::VideoFetcher;
use crate::notify::Notifier;
use crate::store::SeenLedger;
use crate::types::{CandidateItem, SeenRecord, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorSettings {
    pub items_per_source: usize,
    pub notifications_enabled: bool,
    pub fetch_timeout: Duration,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            items_per_source: 5,
            notifications_enabled: true,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&WatchConfig> for DetectorSettings {
    fn from(cfg: &WatchConfig) -> Self {
        Self {
            items_per_source: cfg.items_per_source_limit,
            notifications_enabled: cfg.notifications_enabled,
            fetch_timeout: Duration::from_secs(cfg.fetch_timeout_secs),
        }
    }
}

/// What one detection pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Newly recorded items, in fetch order.
    pub novel: Vec<SeenRecord>,
    /// Candidates without an id.
    pub malformed: usize,
    pub already_seen: usize,
    /// Absent on the read, present on the write: another detector won.
    pub lost_races: usize,
    /// Channel name as reported by the latest fetch.
    pub observed_name: Option<String>,
}

pub struct ChangeDetector {
    fetcher: Arc<dyn VideoFetcher>,
    ledger: Arc<dyn SeenLedger>,
    notifier: Arc<dyn Notifier>,
    settings: DetectorSettings,
}

impl ChangeDetector {
    pub fn new(
        fetcher: Arc<dyn VideoFetcher>,
        ledger: Arc<dyn SeenLedger>,
        notifier: Arc<dyn Notifier>,
        settings: DetectorSettings,
    ) -> Self {
        Self {
            fetcher,
            ledger,
            notifier,
            settings,
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn VideoFetcher> {
        &self.fetcher
    }

    /// Fetch `source` and record its novel items.
    pub async fn detect(&self, source: &Source) -> Result<Detection, DetectError> {
        let limit = self.settings.items_per_source;
        let timeout = self.settings.fetch_timeout;

        let fetched = tokio::time::timeout(timeout, self.fetcher.fetch_recent(&source.locator, limit))
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        let observed_name = fetched
            .iter()
            .map(|c| c.source_name.trim())
            .find(|n| !n.is_empty())
            .map(str::to_string);

        let candidates = fetched
            .into_iter()
            .take(limit)
            .map(|mut c| {
                if c.source_id.is_empty() {
                    c.source_id = source.id.clone();
                }
                if c.source_name.is_empty() {
                    c.source_name = source.display_name.clone();
                }
                c
            })
            .collect();

        let mut found = self.record(candidates, Utc::now()).await?;
        found.observed_name = observed_name;
        Ok(found)
    }

    /// Classify already-fetched candidates against the ledger.
    ///
    /// Ledger errors abort immediately: an item must never be treated as new
    /// because the ledger could not be read.
    pub async fn record(
        &self,
        candidates: Vec<CandidateItem>,
        now: DateTime<Utc>,
    ) -> Result<Detection, StorageError> {
        let mut out = Detection::default();

        for candidate in candidates {
            if candidate.is_malformed() {
                tracing::debug!(
                    source_id = %candidate.source_id,
                    title = %candidate.title,
                    "skipping candidate without id"
                );
                out.malformed += 1;
                continue;
            }
            if self.ledger.exists(&candidate.item_id)? {
                out.already_seen += 1;
                continue;
            }

            let record = SeenRecord::first_seen(candidate, now);
            if !self.ledger.insert_if_absent(&record)? {
                tracing::debug!(item_id = %record.item_id, "lost insert race; not notifying");
                out.lost_races += 1;
                continue;
            }

            if self.settings.notifications_enabled {
                self.notifier.notify(&record).await;
            }
            out.novel.push(record);
        }

        Ok(out)
    }
}
