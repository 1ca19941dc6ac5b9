//! Session wiring: one bulk history phase, then a long-lived live phase.
//!
//! The session owns the series store and both transports. History and
//! live never run concurrently — the live phase begins only after every
//! source's bulk load completed — so each source's ordering invariant
//! is maintained by a single writer at a time.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::HubConfig;
use crate::error::Result;
use crate::feed::FeedCallback;
use crate::history::HistoryLoader;
use crate::live::LiveDeltaClient;
use crate::store::SeriesStore;

/// A complete ingestion session against one hub.
pub struct IngestSession {
    config: HubConfig,
    store: SeriesStore,
    history: HistoryLoader,
    live: LiveDeltaClient,
}

impl IngestSession {
    /// Build a session from config.
    ///
    /// # Errors
    ///
    /// Returns a config error if the device URLs do not parse.
    pub fn new(config: HubConfig) -> Result<Self> {
        let store = SeriesStore::new(config.sensors.count);
        let history = HistoryLoader::new(
            &config.device.base_url,
            &config.device.history_path,
            config.sensors.history_schema(),
        )?;
        let live = LiveDeltaClient::new(
            &config.device.base_url,
            &config.device.events_path,
            config.sensors.live_schema(),
        )?;
        Ok(Self {
            config,
            store,
            history,
            live,
        })
    }

    /// Read access to the series store.
    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    /// Run the bulk history phase once.
    pub async fn load_history(&mut self, feed: &FeedCallback) -> Result<()> {
        self.history.load_all(&mut self.store, feed).await
    }

    /// Run the live phase until `cancel` fires.
    ///
    /// The event channel is re-opened after a fixed delay whenever it
    /// drops. Events missed during a gap are not replayed; a full
    /// session restart reloads history instead.
    pub async fn run_live(&mut self, feed: &FeedCallback, cancel: &CancellationToken) -> Result<()> {
        let delay = Duration::from_secs(self.config.live.reconnect_delay_secs);
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self.live.connect().await {
                Ok(response) => {
                    let outcome = tokio::select! {
                        outcome = self.live.run(response.bytes_stream(), &mut self.store, feed) => outcome,
                        () = cancel.cancelled() => return Ok(()),
                    };
                    if let Err(e) = outcome {
                        warn!(error = %e, "live channel dropped");
                    }
                }
                Err(e) => warn!(error = %e, "live channel connect failed"),
            }
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Ok(()),
            }
        }
    }

    /// Run the whole session: history once, then live until cancelled.
    ///
    /// Cancellation mid-load simply drops in-flight reassembler state;
    /// no partial record is ever committed, so nothing needs rollback.
    pub async fn run(&mut self, feed: &FeedCallback, cancel: &CancellationToken) -> Result<()> {
        let history = tokio::select! {
            outcome = self.load_history(feed) => outcome,
            () = cancel.cancelled() => return Ok(()),
        };
        history?;
        info!(
            sources = self.store.source_count(),
            points = self.store.total_len(),
            "bulk history loaded"
        );
        self.run_live(feed, cancel).await
    }
}
