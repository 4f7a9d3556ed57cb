// src/lib.rs
// Public library surface for the daemon, the demo bin and integration tests.

pub mod api;
pub mod config;
pub mod detector;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::WatchConfig;
pub use crate::detector::{ChangeDetector, Detection, DetectorSettings};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::orchestrator::{CycleSummary, PollOrchestrator};
pub use crate::registry::SourceRegistry;
pub use crate::store::{SeenLedger, SqliteSeenStore};
