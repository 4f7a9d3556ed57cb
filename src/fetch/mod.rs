// src/fetch/mod.rs
pub mod youtube;

pub use youtube::YouTubeFeedFetcher;

use crate::error::{FetchError, ResolutionError};
use crate::types::{CandidateItem, SourceIdentity};

/// Discovers a channel's identity and its most recent uploads.
#[async_trait::async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Map a user-supplied locator (URL, handle, id) to a stable identity.
    async fn resolve_identity(&self, locator: &str) -> Result<SourceIdentity, ResolutionError>;

    /// At most `limit` candidates, newest first.
    async fn fetch_recent(
        &self,
        locator: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, FetchError>;
}
