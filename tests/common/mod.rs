// tests/common/mod.rs
// Shared doubles for integration tests: a scripted fetcher, a recording
// notifier and a ledger that always fails.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use video_watch::error::{FetchError, ResolutionError, StorageError};
use video_watch::fetch::VideoFetcher;
use video_watch::notify::Notifier;
use video_watch::store::SeenLedger;
use video_watch::types::{CandidateItem, SeenRecord, SourceIdentity};

pub fn candidate(id: &str, source: &str) -> CandidateItem {
    CandidateItem {
        item_id: id.into(),
        source_id: source.into(),
        source_name: format!("Channel {source}"),
        title: format!("Video {id}"),
        url: format!("https://www.youtube.com/watch?v={id}"),
        published_at: "2025-09-06T09:00:00+00:00".into(),
    }
}

pub fn identity(id: &str, name: &str) -> SourceIdentity {
    SourceIdentity {
        source_id: id.into(),
        display_name: name.into(),
        canonical_url: format!("https://www.youtube.com/channel/{id}"),
    }
}

pub fn locator(id: &str) -> String {
    format!("https://www.youtube.com/channel/{id}")
}

enum Feed {
    Items(Vec<CandidateItem>),
    Fail(String),
}

/// Fetcher whose answers are set per locator by the test.
#[derive(Default)]
pub struct StubFetcher {
    feeds: Mutex<HashMap<String, Feed>>,
    identities: Mutex<HashMap<String, SourceIdentity>>,
    fetches: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_items(&self, locator: &str, items: Vec<CandidateItem>) {
        self.feeds
            .lock()
            .unwrap()
            .insert(locator.to_string(), Feed::Items(items));
    }

    pub fn fail(&self, locator: &str, msg: &str) {
        self.feeds
            .lock()
            .unwrap()
            .insert(locator.to_string(), Feed::Fail(msg.to_string()));
    }

    pub fn set_identity(&self, locator: &str, identity: SourceIdentity) {
        self.identities
            .lock()
            .unwrap()
            .insert(locator.to_string(), identity);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoFetcher for StubFetcher {
    async fn resolve_identity(&self, locator: &str) -> Result<SourceIdentity, ResolutionError> {
        self.identities
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| ResolutionError::new(locator, "unknown channel"))
    }

    async fn fetch_recent(
        &self,
        locator: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.feeds.lock().unwrap().get(locator) {
            Some(Feed::Items(items)) => Ok(items.iter().take(limit).cloned().collect()),
            Some(Feed::Fail(msg)) => Err(FetchError::Unavailable(msg.clone())),
            None => Err(FetchError::Unavailable(format!("no feed for {locator}"))),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<SeenRecord>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ids(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.item_id.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, item: &SeenRecord) {
        self.seen.lock().unwrap().push(item.clone());
    }
}

/// Ledger whose backing store is gone.
pub struct BrokenLedger;

impl SeenLedger for BrokenLedger {
    fn exists(&self, _item_id: &str) -> Result<bool, StorageError> {
        Err(StorageError::InvalidValue("disk unplugged".into()))
    }
    fn insert_if_absent(&self, _record: &SeenRecord) -> Result<bool, StorageError> {
        Err(StorageError::InvalidValue("disk unplugged".into()))
    }
    fn list_for_source(&self, _source_id: &str) -> Result<Vec<SeenRecord>, StorageError> {
        Err(StorageError::InvalidValue("disk unplugged".into()))
    }
}

/// Ledger that reports every item absent on read, forcing the insert to decide.
pub struct BlindReads(pub Arc<dyn SeenLedger>);

impl SeenLedger for BlindReads {
    fn exists(&self, _item_id: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
    fn insert_if_absent(&self, record: &SeenRecord) -> Result<bool, StorageError> {
        self.0.insert_if_absent(record)
    }
    fn list_for_source(&self, source_id: &str) -> Result<Vec<SeenRecord>, StorageError> {
        self.0.list_for_source(source_id)
    }
}

pub fn record(id: &str, source: &str) -> SeenRecord {
    SeenRecord::first_seen(candidate(id, source), Utc::now())
}
