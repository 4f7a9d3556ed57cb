use super::{headline, NotifyChannel};
use crate::types::SeenRecord;
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct DiscordChannel {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordChannel {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait::async_trait]
impl NotifyChannel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, item: &SeenRecord) -> Result<()> {
        let payload = DiscordWebhookPayload::embed(item);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    url: Option<String>,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn embed(item: &SeenRecord) -> Self {
        let published = if item.published_at.is_empty() {
            "unknown"
        } else {
            item.published_at.as_str()
        };
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: headline(item),
                description: format!("**{}**\nPublished: {}", item.title, published),
                url: (!item.url.is_empty()).then(|| item.url.clone()),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn embed_carries_title_and_link() {
        let item = SeenRecord {
            item_id: "v1".into(),
            source_id: "UC1".into(),
            source_name: "Chan".into(),
            title: "Hello".into(),
            url: "https://www.youtube.com/watch?v=v1".into(),
            published_at: String::new(),
            first_seen_at: Utc::now(),
        };
        let v = serde_json::to_value(DiscordWebhookPayload::embed(&item)).unwrap();
        assert_eq!(v["embeds"][0]["title"], "New video: Chan");
        assert_eq!(v["embeds"][0]["url"], "https://www.youtube.com/watch?v=v1");
        assert!(v["embeds"][0]["description"].as_str().unwrap().contains("Hello"));
    }
}
