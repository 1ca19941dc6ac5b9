//! Gatewatch: streaming history ingestion for an embedded garage-door
//! sensor hub.
//!
//! The hub serves each sensor's retained history as one long chunked
//! HTTP response of adjacent JSON objects with no separator, and pushes
//! live single-point deltas over a Server-Sent-Events channel. This
//! crate turns both into a per-sensor, timestamp-ordered series store
//! that a rendering layer observes incrementally:
//!
//! - **Reassembly**: [`reassembler::FrameReassembler`] recovers discrete
//!   records from arbitrary chunk boundaries, rolling back partial
//!   frames so no fragment is ever half-consumed.
//! - **Bulk load**: [`history::HistoryLoader`] streams one source at a
//!   time, strictly sequentially.
//! - **Live deltas**: [`live::LiveDeltaClient`] folds `clear_history`
//!   and `new_datapoint` events into the same store.
//! - **Store**: [`store::SeriesStore`] keeps every series sorted by
//!   timestamp and hands out snapshots.
//! - **Session**: [`session::IngestSession`] runs the bulk phase once,
//!   then follows the live channel for its lifetime.

pub mod config;
pub mod error;
pub mod feed;
pub mod history;
pub mod live;
pub mod reassembler;
pub mod record;
pub mod session;
pub mod sse;
pub mod store;

pub use config::HubConfig;
pub use error::{IngestError, Result};
pub use feed::{FeedCallback, FeedEvent};
pub use record::{FieldKind, FieldValue, Record, RecordSchema};
pub use session::IngestSession;
pub use store::{SeriesPoint, SeriesStore};
