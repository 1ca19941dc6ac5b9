//! Sequential bulk loader for per-sensor history streams.
//!
//! The hub serves each sensor's retained history as one long chunked
//! response from `GET /get_data?sensorIndex=<i>`. The loader issues
//! exactly one streamed request at a time, in source order; the request
//! for source `k+1` goes out only after response `k` terminates. Each
//! response owns one [`FrameReassembler`], and every emitted batch is
//! appended to the store immediately so a renderer can draw a
//! still-loading series.
//!
//! A transport error halts the sequence and is returned to the caller;
//! there is no automatic retry because re-requesting a half-streamed
//! response would double-ingest the records already emitted.

use futures_util::StreamExt;
use url::Url;

use crate::error::{IngestError, Result};
use crate::feed::{FeedCallback, FeedEvent};
use crate::reassembler::FrameReassembler;
use crate::record::RecordSchema;
use crate::store::SeriesStore;

/// Sequential history loader over the hub's streamed endpoint.
pub struct HistoryLoader {
    client: reqwest::Client,
    endpoint: Url,
    schema: RecordSchema,
}

impl HistoryLoader {
    /// Create a loader for `base_url` + `history_path`.
    ///
    /// # Errors
    ///
    /// Returns a config error if the URL does not parse.
    pub fn new(base_url: &str, history_path: &str, schema: RecordSchema) -> Result<Self> {
        let endpoint = join_endpoint(base_url, history_path)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            schema,
        })
    }

    /// Load every source's history into `store`, strictly sequentially.
    ///
    /// Emits [`FeedEvent::SourceStarted`] per source and
    /// [`FeedEvent::LoadComplete`] exactly once after the final source.
    pub async fn load_all(&self, store: &mut SeriesStore, feed: &FeedCallback) -> Result<()> {
        for source_id in 0..store.source_count() {
            feed(FeedEvent::SourceStarted { source_id });
            self.load_source(source_id, store, feed).await?;
            tracing::info!(source_id, points = store.len(source_id), "source history loaded");
        }
        feed(FeedEvent::LoadComplete);
        Ok(())
    }

    /// Stream one source's response through a fresh reassembler.
    async fn load_source(
        &self,
        source_id: usize,
        store: &mut SeriesStore,
        feed: &FeedCallback,
    ) -> Result<()> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("sensorIndex", &source_id.to_string());

        tracing::debug!(source_id, url = %url, "requesting history");
        let response = self.client.get(url).send().await.map_err(|e| {
            IngestError::Transport(format!("history request for source {source_id} failed: {e}"))
        })?;
        if !response.status().is_success() {
            return Err(IngestError::Transport(format!(
                "history request for source {source_id} returned {}",
                response.status()
            )));
        }

        let total_bytes = response.content_length().filter(|t| *t > 0);
        let mut received: u64 = 0;
        let mut reassembler = FrameReassembler::new(self.schema.clone());
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                IngestError::Stream(format!("history stream for source {source_id} failed: {e}"))
            })?;
            received += chunk.len() as u64;

            let text = String::from_utf8_lossy(&chunk);
            let records = reassembler.feed(&text);
            if !records.is_empty() {
                let points = records.iter().cloned().map(Into::into).collect();
                store.bulk_append(source_id, points)?;
                feed(FeedEvent::RecordsAppended { source_id, records });
            }
            feed(FeedEvent::LoadProgress {
                source_id,
                fraction: total_bytes.map(|total| received as f64 / total as f64),
            });
        }

        let _ = reassembler.finalize();
        Ok(())
    }
}

/// Join a device base URL with an endpoint path.
pub(crate) fn join_endpoint(base_url: &str, path: &str) -> Result<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| IngestError::Config(format!("invalid base url {base_url:?}: {e}")))?;
    base.join(path)
        .map_err(|e| IngestError::Config(format!("invalid endpoint path {path:?}: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::record::FieldKind;

    #[test]
    fn join_endpoint_appends_path() {
        let url = join_endpoint("http://192.168.4.1", "/get_data")
            .unwrap_or_else(|e| panic!("join failed: {e}"));
        assert_eq!(url.as_str(), "http://192.168.4.1/get_data");
    }

    #[test]
    fn join_endpoint_rejects_bad_base() {
        let err = join_endpoint("not a url", "/get_data");
        assert!(matches!(err, Err(IngestError::Config(_))));
    }

    #[test]
    fn loader_rejects_bad_base_url() {
        let schema = RecordSchema::new(false).with_field("batP", FieldKind::Number);
        let err = HistoryLoader::new("::garbage::", "/get_data", schema);
        assert!(err.is_err());
    }
}
