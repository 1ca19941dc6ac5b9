//! Headless ingestion runner.
//!
//! Loads `gatewatch.toml` (path from argv, defaults applied when the
//! file is absent), streams the hub's history into memory, then follows
//! the live event channel until ctrl-c. All diagnostic output goes
//! through tracing on stderr.

use std::path::PathBuf;

use gatewatch::config::HubConfig;
use gatewatch::feed::{FeedCallback, FeedEvent};
use gatewatch::session::IngestSession;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("gatewatch.toml"));
    let config = if path.exists() {
        HubConfig::load(&path)?
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        HubConfig::default()
    };

    let mut session = IngestSession::new(config)?;
    let cancel = CancellationToken::new();

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            ctrl_c_cancel.cancel();
        }
    });

    let feed: FeedCallback = Box::new(|event| match event {
        FeedEvent::SourceStarted { source_id } => {
            tracing::info!(source_id, "loading history");
        }
        FeedEvent::RecordsAppended { source_id, records } => {
            if let Some(last) = records.last() {
                let latest = last
                    .timestamp_utc()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| last.timestamp.to_string());
                tracing::info!(source_id, count = records.len(), %latest, "records appended");
            }
        }
        FeedEvent::LoadProgress {
            source_id,
            fraction: Some(fraction),
        } => {
            tracing::debug!(source_id, "history {:.0}% loaded", fraction * 100.0);
        }
        FeedEvent::LoadProgress { .. } => {}
        FeedEvent::LoadComplete => tracing::info!("history load complete"),
        FeedEvent::Cleared => tracing::info!("history cleared by device"),
    });

    session
        .run(&feed, &cancel)
        .await
        .map_err(|e| anyhow::anyhow!("session failed: {e}"))?;

    tracing::info!("gatewatch stopped");
    Ok(())
}
