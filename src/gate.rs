// src/gate.rs
use std::time::Duration;

use tokio::time::Instant;

/// Minimum-interval gate in front of the poll cycle.
/// - First cycle always allowed.
/// - Inside the interval, triggers are coalesced (dropped, not queued).
/// - `try_begin` records the start time when it lets a cycle through.
///
/// Times are monotonic. The scheduler passes its tick deadline rather than
/// the moment the task woke up, so ticks exactly one interval apart always pass.
#[derive(Debug, Clone)]
pub struct CheckGate {
    min_interval: Duration,
    last_started: Option<Instant>,
}

impl CheckGate {
    /// `min_interval_secs` of 0 disables gating.
    pub fn new(min_interval_secs: u64) -> Self {
        Self {
            min_interval: Duration::from_secs(min_interval_secs),
            last_started: None,
        }
    }

    /// Would a cycle starting at `now` pass? Does NOT mutate state.
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last_started {
            None => true,
            Some(ts) => now.saturating_duration_since(ts) >= self.min_interval,
        }
    }

    /// Claim the gate for a cycle starting at `now`.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if !self.is_open(now) {
            return false;
        }
        self.last_started = Some(now);
        true
    }

    pub fn last_started(&self) -> Option<Instant> {
        self.last_started
    }
}
