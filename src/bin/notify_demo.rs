//! Demo that pushes a few fake uploads through the multiplexer (log only unless
//! DISCORD_WEBHOOK_URL / SLACK_WEBHOOK_URL are set).

use chrono::Utc;
use video_watch::types::SeenRecord;
use video_watch::{Notifier, NotifierMux};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();
    let mux = NotifierMux::from_env();

    let titles = ["Unboxing the thing", "Live Q&A", "Weekly recap"];

    for (i, title) in titles.iter().enumerate() {
        let id = format!("demo{i:07}");
        let item = SeenRecord {
            url: format!("https://www.youtube.com/watch?v={id}"),
            item_id: id,
            source_id: "UCdemo".into(),
            source_name: "Demo Channel".into(),
            title: (*title).to_string(),
            published_at: Utc::now().to_rfc3339(),
            first_seen_at: Utc::now(),
        };
        mux.notify(&item).await;
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }

    println!("notify-demo done");
}
