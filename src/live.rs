//! Live delta client for the hub's event channel.
//!
//! After the bulk history phase, the hub pushes incremental updates
//! over `GET /events` as Server-Sent Events. Two named events reach the
//! store: `clear_history` discards every source's points (the device
//! reset its retained history), and `new_datapoint` carries one record
//! that is validated and appended tail-biased.
//!
//! Reconnection policy belongs to the embedding layer (see
//! [`crate::session`]); this client only logs connection transitions
//! and never buffers missed events. Whatever the device pushed during a
//! gap stays missing until the next full history reload.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use url::Url;

use crate::error::{IngestError, Result};
use crate::feed::{FeedCallback, FeedEvent};
use crate::history::join_endpoint;
use crate::record::{FrameParse, RecordSchema, decode_frame};
use crate::sse::{SseDecoder, SseFrame};
use crate::store::SeriesStore;

/// Event name the device sends when it resets retained history.
const EVENT_CLEAR: &str = "clear_history";
/// Event name for one new live measurement.
const EVENT_DATAPOINT: &str = "new_datapoint";

/// Client for the hub's live event channel.
pub struct LiveDeltaClient {
    client: reqwest::Client,
    endpoint: Url,
    schema: RecordSchema,
    dropped_out_of_range: u64,
}

impl LiveDeltaClient {
    /// Create a client for `base_url` + `events_path`.
    ///
    /// The schema must require `sourceId`: live deltas from every
    /// sensor share one channel.
    ///
    /// # Errors
    ///
    /// Returns a config error if the URL does not parse.
    pub fn new(base_url: &str, events_path: &str, schema: RecordSchema) -> Result<Self> {
        let endpoint = join_endpoint(base_url, events_path)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            schema,
            dropped_out_of_range: 0,
        })
    }

    /// Live points dropped because their `sourceId` was out of range.
    pub fn dropped_out_of_range(&self) -> u64 {
        self.dropped_out_of_range
    }

    /// Open the event channel.
    ///
    /// Returns the streaming response; the caller owns reconnect policy
    /// and passes `response.bytes_stream()` to [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request fails or the device
    /// answers with a non-success status.
    pub async fn connect(&self) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| IngestError::Transport(format!("event channel connect failed: {e}")))?;
        if !response.status().is_success() {
            return Err(IngestError::Transport(format!(
                "event channel returned {}",
                response.status()
            )));
        }
        tracing::info!(url = %self.endpoint, "event channel connected");
        Ok(response)
    }

    /// Apply live events from `bytes` until the stream ends.
    ///
    /// Returns `Ok(())` on an orderly remote close and an error on a
    /// mid-stream transport failure; either way the channel is
    /// disconnected when this returns.
    pub async fn run<S, E>(
        &mut self,
        mut bytes: S,
        store: &mut SeriesStore,
        feed: &FeedCallback,
    ) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(error = %e, "event channel disconnected");
                    return Err(IngestError::Stream(format!("event stream failed: {e}")));
                }
            };
            for frame in decoder.push(&chunk) {
                self.apply(frame, store, feed)?;
            }
        }
        tracing::info!("event channel closed by device");
        Ok(())
    }

    /// Apply one decoded SSE frame to the store.
    fn apply(
        &mut self,
        frame: SseFrame,
        store: &mut SeriesStore,
        feed: &FeedCallback,
    ) -> Result<()> {
        match frame.event.as_deref() {
            Some(EVENT_CLEAR) => {
                tracing::info!("device cleared retained history");
                store.clear();
                feed(FeedEvent::Cleared);
            }
            Some(EVENT_DATAPOINT) => {
                let record = match decode_frame(&frame.data, &self.schema) {
                    FrameParse::Complete(record) => record,
                    FrameParse::Incomplete => {
                        tracing::warn!(
                            data = %frame.data,
                            "live datapoint missing required members, skipping"
                        );
                        return Ok(());
                    }
                    FrameParse::Malformed => {
                        tracing::warn!(
                            data = %frame.data,
                            "live datapoint is not valid JSON, skipping"
                        );
                        return Ok(());
                    }
                };
                // the live schema requires sourceId, so this is always Some
                let Some(source_id) = record.source_id else {
                    return Ok(());
                };
                if source_id >= store.source_count() {
                    self.dropped_out_of_range += 1;
                    tracing::warn!(
                        source_id,
                        dropped = self.dropped_out_of_range,
                        "live datapoint for unknown source, dropping"
                    );
                    return Ok(());
                }
                store.append(source_id, record.clone().into())?;
                feed(FeedEvent::RecordsAppended {
                    source_id,
                    records: vec![record],
                });
            }
            other => {
                tracing::debug!(event = ?other, data = %frame.data, "unhandled event frame");
            }
        }
        Ok(())
    }
}
