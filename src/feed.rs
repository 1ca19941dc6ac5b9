//! Feed surface observed by the rendering collaborator.
//!
//! The pipeline reports every store mutation batch through a
//! [`FeedCallback`] so a chart layer can redraw a still-loading series
//! incrementally, mirror a device-initiated clear, and dismiss its
//! loading indicator once the last source completes.

use crate::record::Record;

/// Events emitted by the ingestion pipeline.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A bulk history load started for one source.
    SourceStarted {
        /// Source index about to load.
        source_id: usize,
    },

    /// Records were appended to one source's series.
    ///
    /// Emitted per reassembled batch during bulk loads and per point
    /// during the live phase.
    RecordsAppended {
        /// Source the records belong to.
        source_id: usize,
        /// The appended records, in emission order.
        records: Vec<Record>,
    },

    /// Bulk-load progress for one source.
    LoadProgress {
        /// Source currently loading.
        source_id: usize,
        /// Fraction of the response consumed; `None` when the device
        /// did not announce a length.
        fraction: Option<f64>,
    },

    /// Every source finished its bulk history load.
    LoadComplete,

    /// The device reset its retained history; all series are now empty.
    Cleared,
}

/// Callback type for receiving feed events.
///
/// The rendering collaborator (chart layer, CLI logger) implements this
/// to observe the store without owning it.
pub type FeedCallback = Box<dyn Fn(FeedEvent) + Send + Sync>;
