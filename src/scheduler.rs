// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::orchestrator::PollOrchestrator;

/// Spawn the periodic trigger. Each tick runs one cycle to completion; the
/// shutdown signal is only observed between cycles. Cycles are gated on the
/// tick deadline, not on when the task woke up.
pub fn spawn_poll_scheduler(
    orchestrator: Arc<PollOrchestrator>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let deadline = tokio::select! {
                deadline = ticker.tick() => deadline,
                _ = shutdown.changed() => break,
            };
            if *shutdown.borrow() {
                break;
            }

            match orchestrator.run_cycle_at(deadline).await {
                Ok(summary) if summary.coalesced => {}
                Ok(summary) => {
                    tracing::debug!(
                        target: "scheduler",
                        checked = summary.checked,
                        novel = summary.novel,
                        failures = summary.failures.len(),
                        "scheduled tick"
                    );
                }
                Err(e) => {
                    tracing::warn!(target: "scheduler", error = %e, "scheduled cycle aborted");
                }
            }
        }
        tracing::info!(target: "scheduler", "poll scheduler stopped");
    })
}
