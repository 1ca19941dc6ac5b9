//! In-memory per-source time series store.
//!
//! One timestamp-ordered sequence of measurement points per sensor.
//! History loads append forward-ordered batches; live deltas append
//! near-sorted single points with an ordered-insert fallback, so a
//! snapshot is always non-decreasing in timestamp. The store is owned
//! by the session; renderers read snapshots and never mutate.

use std::collections::BTreeMap;

use crate::error::{IngestError, Result};
use crate::record::{FieldValue, Record};

/// One stored measurement point.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Measurement values keyed by wire name.
    pub fields: BTreeMap<String, FieldValue>,
}

impl From<Record> for SeriesPoint {
    fn from(record: Record) -> Self {
        Self {
            timestamp: record.timestamp,
            fields: record.fields,
        }
    }
}

/// Per-source, timestamp-ordered series storage.
#[derive(Debug)]
pub struct SeriesStore {
    series: Vec<Vec<SeriesPoint>>,
}

impl SeriesStore {
    /// Create a store with `source_count` empty series.
    pub fn new(source_count: usize) -> Self {
        Self {
            series: vec![Vec::new(); source_count],
        }
    }

    /// Number of sources.
    pub fn source_count(&self) -> usize {
        self.series.len()
    }

    /// Number of points stored for one source.
    pub fn len(&self, source_id: usize) -> usize {
        self.series.get(source_id).map_or(0, Vec::len)
    }

    /// Total points across all sources.
    pub fn total_len(&self) -> usize {
        self.series.iter().map(Vec::len).sum()
    }

    /// Ordered view of one source's series.
    ///
    /// Non-decreasing in timestamp; empty for out-of-range sources.
    pub fn snapshot(&self, source_id: usize) -> &[SeriesPoint] {
        self.series.get(source_id).map_or(&[], Vec::as_slice)
    }

    /// Append one live point.
    ///
    /// Live arrival is near-sorted: a point at or after the current
    /// tail is pushed in O(1). An older point falls back to an ordered
    /// insert so the sort invariant survives a device clock step.
    pub fn append(&mut self, source_id: usize, point: SeriesPoint) -> Result<()> {
        let series = self.series_mut(source_id)?;
        match series.last() {
            Some(last) if point.timestamp < last.timestamp => {
                let at = series.partition_point(|p| p.timestamp <= point.timestamp);
                tracing::debug!(source_id, at, "live point older than tail, ordered insert");
                series.insert(at, point);
            }
            _ => series.push(point),
        }
        Ok(())
    }

    /// Append a batch from a bulk history load.
    ///
    /// History responses are forward-ordered, so this is an extend; if
    /// a batch nevertheless introduces an inversion the series is
    /// re-sorted to keep the snapshot invariant.
    pub fn bulk_append(&mut self, source_id: usize, points: Vec<SeriesPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let series = self.series_mut(source_id)?;
        let junction = series.len().saturating_sub(1);
        series.extend(points);
        let sorted = series[junction..]
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp);
        if !sorted {
            tracing::debug!(source_id, "bulk batch out of order, re-sorting series");
            series.sort_by_key(|p| p.timestamp);
        }
        Ok(())
    }

    /// Discard every source's points, keeping the source count.
    pub fn clear(&mut self) {
        for series in &mut self.series {
            series.clear();
        }
    }

    fn series_mut(&mut self, source_id: usize) -> Result<&mut Vec<SeriesPoint>> {
        let count = self.series.len();
        self.series.get_mut(source_id).ok_or_else(|| {
            IngestError::Store(format!("source index {source_id} out of range (0..{count})"))
        })
    }
}
