//! Novelty ledger: the durable record of every item already reported.
//!
//! The ledger is the single source of truth for "already notified". Exactly-once
//! delivery rests on [`SeenLedger::insert_if_absent`] being one atomic write at
//! the storage layer, so two detectors racing on the same item can never both
//! win.

mod sqlite;

pub use sqlite::SqliteSeenStore;

use crate::error::StorageError;
use crate::types::SeenRecord;

pub trait SeenLedger: Send + Sync {
    /// True iff a record with this id exists. Never a false positive.
    fn exists(&self, item_id: &str) -> Result<bool, StorageError>;

    /// Insert unless `item_id` is already present. Returns whether the insert happened.
    fn insert_if_absent(&self, record: &SeenRecord) -> Result<bool, StorageError>;

    /// Records first seen for one source, oldest first.
    fn list_for_source(&self, source_id: &str) -> Result<Vec<SeenRecord>, StorageError>;
}
