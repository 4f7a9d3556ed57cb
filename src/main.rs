//! video-watch daemon entrypoint.
//! Loads config, opens the registry and ledger, starts the poll scheduler and
//! serves the HTTP trigger / management API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use video_watch::api::{self, AppState};
use video_watch::fetch::{VideoFetcher, YouTubeFeedFetcher};
use video_watch::metrics::Metrics;
use video_watch::scheduler::spawn_poll_scheduler;
use video_watch::{
    ChangeDetector, DetectorSettings, NotifierMux, PollOrchestrator, SourceRegistry,
    SqliteSeenStore, WatchConfig,
};

/// `RUST_LOG` controls the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("video_watch=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatchConfig::load_default()?;
    tracing::info!(
        poll_interval_secs = cfg.poll_interval_secs,
        min_check_interval_secs = cfg.min_check_interval_secs,
        items_per_source = cfg.items_per_source_limit,
        notifications = cfg.notifications_enabled,
        "config loaded"
    );

    let ledger = Arc::new(
        SqliteSeenStore::open(&cfg.ledger_path)
            .with_context(|| format!("opening ledger {}", cfg.ledger_path.display()))?,
    );
    let registry = Arc::new(SourceRegistry::open(cfg.registry_path.clone()));
    let fetcher: Arc<dyn VideoFetcher> = Arc::new(YouTubeFeedFetcher::new(Duration::from_secs(
        cfg.fetch_timeout_secs,
    ))?);
    let notifier = Arc::new(NotifierMux::from_env());

    let detector = ChangeDetector::new(
        fetcher,
        ledger.clone(),
        notifier,
        DetectorSettings::from(&cfg),
    );
    let orchestrator = Arc::new(PollOrchestrator::new(
        registry,
        detector,
        cfg.min_check_interval_secs,
    ));

    let metrics = Metrics::init().context("installing prometheus recorder")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = spawn_poll_scheduler(
        orchestrator.clone(),
        Duration::from_secs(cfg.poll_interval_secs),
        shutdown_rx,
    );

    let app = api::router(AppState {
        orchestrator,
        ledger,
    })
    .merge(metrics.router())
    .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    tracing::info!(addr = %cfg.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    // Lets an in-flight cycle finish before exiting.
    let _ = shutdown_tx.send(true);
    scheduler.await?;
    Ok(())
}
