use anyhow::Result;

use super::{headline, NotifyChannel};
use crate::types::SeenRecord;

/// Always-on channel: one structured log line per new upload.
pub struct LogChannel;

#[async_trait::async_trait]
impl NotifyChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, item: &SeenRecord) -> Result<()> {
        tracing::info!(
            target: "notify",
            item_id = %item.item_id,
            url = %item.url,
            "{}: {}",
            headline(item),
            item.title
        );
        Ok(())
    }
}
