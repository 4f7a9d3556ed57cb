//! One poll cycle across every registered source.
//!
//! `Idle -> Polling -> Idle`. A trigger that arrives before the minimum
//! interval has elapsed since the last cycle started is coalesced: it returns
//! immediately with `coalesced = true` and fetches nothing. Per-source fetch
//! failures are collected into the summary; a ledger failure aborts the rest of
//! the cycle because novelty can no longer be decided.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::time::Instant;

use crate::detector::ChangeDetector;
use crate::error::{CycleError, DetectError};
use crate::gate::CheckGate;
use crate::registry::SourceRegistry;
use crate::types::{SeenRecord, Source};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_cycles_total", "Poll cycles that ran.");
        describe_counter!(
            "watch_cycles_coalesced_total",
            "Triggers dropped by the minimum-interval gate."
        );
        describe_counter!("watch_novel_items_total", "Items recorded as new.");
        describe_counter!(
            "watch_source_failures_total",
            "Per-source fetch failures."
        );
        describe_counter!(
            "watch_malformed_items_total",
            "Candidates skipped for missing an id."
        );
        describe_counter!(
            "watch_notify_errors_total",
            "Notification channel failures."
        );
        describe_gauge!("watch_last_cycle_ts", "Unix ts when the last cycle started.");
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source_id: String,
    pub source_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// True when the trigger was dropped by the interval gate.
    pub coalesced: bool,
    pub checked: usize,
    pub novel: usize,
    pub novel_items: Vec<SeenRecord>,
    pub malformed: usize,
    pub failures: Vec<SourceFailure>,
}

impl CycleSummary {
    pub fn coalesced() -> Self {
        Self {
            coalesced: true,
            ..Self::default()
        }
    }
}

pub struct PollOrchestrator {
    registry: Arc<SourceRegistry>,
    detector: ChangeDetector,
    gate: Mutex<CheckGate>,
}

impl PollOrchestrator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        detector: ChangeDetector,
        min_check_interval_secs: u64,
    ) -> Self {
        Self {
            registry,
            detector,
            gate: Mutex::new(CheckGate::new(min_check_interval_secs)),
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub async fn run_cycle(&self) -> Result<CycleSummary, CycleError> {
        self.run_cycle_at(Instant::now()).await
    }

    /// Run a cycle as if triggered at `now` (monotonic).
    pub async fn run_cycle_at(&self, now: Instant) -> Result<CycleSummary, CycleError> {
        ensure_metrics_described();

        let admitted = {
            let mut gate = self.gate.lock().unwrap_or_else(|p| p.into_inner());
            gate.try_begin(now)
        };
        if !admitted {
            tracing::debug!("check trigger coalesced by minimum interval");
            counter!("watch_cycles_coalesced_total").increment(1);
            return Ok(CycleSummary::coalesced());
        }
        counter!("watch_cycles_total").increment(1);
        gauge!("watch_last_cycle_ts").set(Utc::now().timestamp() as f64);

        let sources = self.registry.list().map_err(|e| {
            tracing::error!(error = %e, "cannot read source registry; cycle skipped");
            CycleError::Registry(e)
        })?;

        let mut summary = CycleSummary::default();
        let outcome = self.check_sources(&sources, &mut summary).await;

        // Counted on every exit, aborted cycles included.
        counter!("watch_novel_items_total").increment(summary.novel as u64);
        counter!("watch_source_failures_total").increment(summary.failures.len() as u64);
        counter!("watch_malformed_items_total").increment(summary.malformed as u64);
        outcome?;

        tracing::info!(
            checked = summary.checked,
            novel = summary.novel,
            failures = summary.failures.len(),
            malformed = summary.malformed,
            "poll cycle finished"
        );
        Ok(summary)
    }

    async fn check_sources(
        &self,
        sources: &[Source],
        summary: &mut CycleSummary,
    ) -> Result<(), CycleError> {
        for source in sources {
            summary.checked += 1;
            match self.detector.detect(source).await {
                Ok(found) => {
                    if !found.novel.is_empty() {
                        tracing::info!(
                            source_id = %source.id,
                            name = %source.display_name,
                            novel = found.novel.len(),
                            "new items"
                        );
                    }
                    if let Some(name) = found
                        .observed_name
                        .as_deref()
                        .filter(|n| *n != source.display_name)
                    {
                        if let Err(e) = self.registry.refresh_display_name(&source.id, name) {
                            tracing::warn!(source_id = %source.id, error = %e, "display name refresh failed");
                        }
                    }
                    summary.malformed += found.malformed;
                    summary.novel += found.novel.len();
                    summary.novel_items.extend(found.novel);
                }
                Err(DetectError::Fetch(e)) => {
                    tracing::warn!(
                        source_id = %source.id,
                        name = %source.display_name,
                        error = %e,
                        "source fetch failed"
                    );
                    summary.failures.push(SourceFailure {
                        source_id: source.id.clone(),
                        source_name: source.display_name.clone(),
                        error: e.to_string(),
                    });
                }
                Err(DetectError::Storage(e)) => {
                    tracing::error!(source_id = %source.id, error = %e, "ledger failure; cycle aborted");
                    return Err(CycleError::Storage(e));
                }
            }
        }
        Ok(())
    }
}
