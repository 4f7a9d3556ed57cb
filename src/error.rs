// src/error.rs
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure reaching or reading a source during a cycle. Never fatal to the cycle.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed feed: {0}")]
    Parse(String),
    #[error("invalid locator: {0}")]
    Locator(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// A locator that cannot be mapped to a stable channel identity.
#[derive(Error, Debug)]
#[error("cannot resolve `{locator}`: {reason}")]
pub struct ResolutionError {
    pub locator: String,
    pub reason: String,
}

impl ResolutionError {
    pub fn new(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }
}

/// Persistence layer unavailable or corrupt.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
    #[error("storage lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("source {display_name} ({source_id}) is already registered")]
    Duplicate {
        source_id: String,
        display_name: String,
    },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a failed detection for one source.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors that abort a whole poll cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("source registry unreadable: {0}")]
    Registry(StorageError),
    #[error("novelty ledger unavailable: {0}")]
    Storage(StorageError),
}
