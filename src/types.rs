// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a source entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Manual,
    Synced,
}

/// A monitored channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub display_name: String,
    /// Canonical, fetch-resolvable reference (channel URL).
    pub locator: String,
    pub added_at: DateTime<Utc>,
    pub origin: SourceOrigin,
}

impl Source {
    pub fn from_identity(
        identity: SourceIdentity,
        origin: SourceOrigin,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: identity.source_id,
            display_name: identity.display_name,
            locator: identity.canonical_url,
            added_at,
            origin,
        }
    }
}

/// Result of resolving a locator through the fetch adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIdentity {
    pub source_id: String,
    pub display_name: String,
    pub canonical_url: String,
}

/// An item returned by a fresh fetch, not yet checked against history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub item_id: String,
    pub source_id: String,
    pub source_name: String,
    pub title: String,
    pub url: String,
    /// Raw publication stamp as reported upstream; may be empty.
    pub published_at: String,
}

impl CandidateItem {
    /// Candidates without an identifier can never be deduplicated.
    pub fn is_malformed(&self) -> bool {
        self.item_id.trim().is_empty()
    }
}

/// An entry of the novelty ledger. Never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub item_id: String,
    pub source_id: String,
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub published_at: String,
    pub first_seen_at: DateTime<Utc>,
}

impl SeenRecord {
    pub fn first_seen(candidate: CandidateItem, now: DateTime<Utc>) -> Self {
        Self {
            item_id: candidate.item_id,
            source_id: candidate.source_id,
            source_name: candidate.source_name,
            title: candidate.title,
            url: candidate.url,
            published_at: candidate.published_at,
            first_seen_at: now,
        }
    }
}
