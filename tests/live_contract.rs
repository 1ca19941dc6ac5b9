//! Live Event Channel Contract Tests
//!
//! Verify the live client's HTTP contract against a mock hub: the SSE
//! accept header, end-to-end application of `clear_history` and
//! `new_datapoint` frames, and error surfacing for a refused channel.

use std::sync::{Arc, Mutex};

use gatewatch::feed::{FeedCallback, FeedEvent};
use gatewatch::live::LiveDeltaClient;
use gatewatch::record::{FieldKind, RecordSchema};
use gatewatch::store::SeriesStore;
use gatewatch::IngestError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schema() -> RecordSchema {
    RecordSchema::new(true).with_field("batP", FieldKind::Number)
}

fn collecting_feed() -> (FeedCallback, Arc<Mutex<Vec<FeedEvent>>>) {
    let seen: Arc<Mutex<Vec<FeedEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let feed: FeedCallback = Box::new(move |event| {
        let Ok(mut guard) = seen_clone.lock() else {
            return;
        };
        guard.push(event);
    });
    (feed, seen)
}

#[tokio::test]
async fn subscribes_with_event_stream_accept_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "event: new_datapoint\n",
            "data: {\"sourceId\":0,\"timestamp\":10,\"batP\":81.5}\n\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = LiveDeltaClient::new(&mock_server.uri(), "/events", schema())
        .unwrap_or_else(|e| panic!("client construction failed: {e}"));
    let mut store = SeriesStore::new(2);
    let (feed, _seen) = collecting_feed();

    let response = client
        .connect()
        .await
        .unwrap_or_else(|e| panic!("connect failed: {e}"));
    client
        .run(response.bytes_stream(), &mut store, &feed)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert_eq!(store.len(0), 1);
    assert_eq!(store.snapshot(0)[0].timestamp, 10);
}

#[tokio::test]
async fn clear_then_datapoint_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "event: clear_history\n\n",
            "event: new_datapoint\n",
            "data: {\"sourceId\":0,\"timestamp\":5,\"batP\":40,\"pin\":true}\n\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = LiveDeltaClient::new(&mock_server.uri(), "/events", schema())
        .unwrap_or_else(|e| panic!("client construction failed: {e}"));
    let mut store = SeriesStore::new(2);
    // pretend a bulk load already populated source 1
    store
        .bulk_append(
            1,
            vec![gatewatch::store::SeriesPoint {
                timestamp: 1,
                fields: Default::default(),
            }],
        )
        .unwrap_or_else(|e| panic!("seed append failed: {e}"));
    let (feed, seen) = collecting_feed();

    let response = client
        .connect()
        .await
        .unwrap_or_else(|e| panic!("connect failed: {e}"));
    client
        .run(response.bytes_stream(), &mut store, &feed)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    // the clear wiped source 1; only the new live point remains
    assert!(store.snapshot(1).is_empty());
    assert_eq!(store.len(0), 1);

    let guard = seen.lock().unwrap_or_else(|e| e.into_inner());
    assert!(matches!(guard[0], FeedEvent::Cleared));
    assert!(matches!(
        guard[1],
        FeedEvent::RecordsAppended { source_id: 0, .. }
    ));
}

#[tokio::test]
async fn refused_channel_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = LiveDeltaClient::new(&mock_server.uri(), "/events", schema())
        .unwrap_or_else(|e| panic!("client construction failed: {e}"));
    let outcome = client.connect().await;
    assert!(matches!(outcome, Err(IngestError::Transport(_))));
}

#[tokio::test]
async fn keep_alive_comments_do_not_disturb_frames() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            ": ping\n\n",
            "event: new_datapoint\n",
            "data: {\"sourceId\":1,\"timestamp\":3,\"batP\":77}\n\n",
            ": ping\n\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = LiveDeltaClient::new(&mock_server.uri(), "/events", schema())
        .unwrap_or_else(|e| panic!("client construction failed: {e}"));
    let mut store = SeriesStore::new(2);
    let (feed, seen) = collecting_feed();

    let response = client
        .connect()
        .await
        .unwrap_or_else(|e| panic!("connect failed: {e}"));
    client
        .run(response.bytes_stream(), &mut store, &feed)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert_eq!(store.len(1), 1);
    let guard = seen.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(guard.len(), 1);
}
