// src/store/sqlite.rs
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::SeenLedger;
use crate::error::StorageError;
use crate::types::SeenRecord;

/// Cross-handle contention (a second process or a second store on the same
/// file) waits this long on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS seen_items (
        item_id       TEXT PRIMARY KEY,
        source_id     TEXT NOT NULL,
        source_name   TEXT NOT NULL DEFAULT '',
        title         TEXT NOT NULL DEFAULT '',
        url           TEXT NOT NULL DEFAULT '',
        published_at  TEXT NOT NULL DEFAULT '',
        first_seen_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_seen_items_source ON seen_items(source_id);
";

/// SQLite-backed ledger. Append-only: rows are inserted once and never touched again.
pub struct SqliteSeenStore {
    conn: Mutex<Connection>,
}

impl SqliteSeenStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets readers proceed while another handle writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::bootstrap(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Total number of items ever recorded.
    pub fn count(&self) -> Result<u64, StorageError> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM seen_items", [], |row| row.get(0))?;
        u64::try_from(n).map_err(|_| StorageError::InvalidValue(format!("row count {n}")))
    }
}

impl SeenLedger for SqliteSeenStore {
    fn exists(&self, item_id: &str) -> Result<bool, StorageError> {
        let hit = self
            .conn()?
            .query_row(
                "SELECT 1 FROM seen_items WHERE item_id = ?1",
                params![item_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    fn insert_if_absent(&self, record: &SeenRecord) -> Result<bool, StorageError> {
        // One statement: the PRIMARY KEY decides the race, not application code.
        // IMMEDIATE takes the write lock up front so a second handle on the same
        // file waits on busy_timeout instead of failing on a stale snapshot.
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "INSERT OR IGNORE INTO seen_items
                (item_id, source_id, source_name, title, url, published_at, first_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.item_id,
                record.source_id,
                record.source_name,
                record.title,
                record.url,
                record.published_at,
                record.first_seen_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(changed == 1)
    }

    fn list_for_source(&self, source_id: &str) -> Result<Vec<SeenRecord>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT item_id, source_id, source_name, title, url, published_at, first_seen_at
             FROM seen_items
             WHERE source_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![source_id], |row| {
            Ok(RawRow {
                item_id: row.get(0)?,
                source_id: row.get(1)?,
                source_name: row.get(2)?,
                title: row.get(3)?,
                url: row.get(4)?,
                published_at: row.get(5)?,
                first_seen_at: row.get(6)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }
}

struct RawRow {
    item_id: String,
    source_id: String,
    source_name: String,
    title: String,
    url: String,
    published_at: String,
    first_seen_at: String,
}

impl RawRow {
    fn into_record(self) -> Result<SeenRecord, StorageError> {
        let first_seen_at = DateTime::parse_from_rfc3339(&self.first_seen_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                StorageError::InvalidValue(format!("first_seen_at '{}': {e}", self.first_seen_at))
            })?;
        Ok(SeenRecord {
            item_id: self.item_id,
            source_id: self.source_id,
            source_name: self.source_name,
            title: self.title,
            url: self.url,
            published_at: self.published_at,
            first_seen_at,
        })
    }
}
