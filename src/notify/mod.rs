//! Fan-out of novel-item notifications.
//!
//! [`Notifier`] is the one-method capability the change detector depends on:
//! it never fails. Concrete backends implement the fallible [`NotifyChannel`]
//! and are combined by [`NotifierMux`], which logs and counts failures and
//! otherwise drops them.

pub mod discord;
pub mod log;
pub mod slack;

use anyhow::Result;
use metrics::counter;

use crate::types::SeenRecord;

pub use discord::DiscordChannel;
pub use log::LogChannel;
pub use slack::SlackChannel;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Best-effort delivery. Must not fail or panic.
    async fn notify(&self, item: &SeenRecord);
}

#[async_trait::async_trait]
pub trait NotifyChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, item: &SeenRecord) -> Result<()>;
}

/// Headline shown for a new upload, e.g. "New video: Some Channel".
pub fn headline(item: &SeenRecord) -> String {
    let channel = if item.source_name.is_empty() {
        "Unknown Channel"
    } else {
        item.source_name.as_str()
    };
    format!("New video: {channel}")
}

pub struct NotifierMux {
    channels: Vec<Box<dyn NotifyChannel>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn NotifyChannel>>) -> Self {
        Self { channels }
    }

    /// Log channel always; Discord / Slack when their webhook env vars are set.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn NotifyChannel>> = vec![Box::new(LogChannel)];
        if let Some(d) = DiscordChannel::from_env() {
            channels.push(Box::new(d));
        }
        if let Some(s) = SlackChannel::from_env() {
            channels.push(Box::new(s));
        }
        let mux = Self { channels };
        tracing::info!(channels = ?mux.channel_names(), "notifier channels");
        mux
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierMux {
    async fn notify(&self, item: &SeenRecord) {
        for ch in &self.channels {
            if let Err(e) = ch.send(item).await {
                tracing::warn!(
                    channel = ch.name(),
                    item_id = %item.item_id,
                    error = %format!("{e:#}"),
                    "notification failed"
                );
                counter!("watch_notify_errors_total").increment(1);
            }
        }
    }
}
