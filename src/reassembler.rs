//! Frame reassembly for the hub's undelimited history stream.
//!
//! The hub writes a history response as JSON objects back to back with
//! no separator: the only framing signal is a closing brace immediately
//! followed by an opening one (`}{`). Transport chunks carry no
//! alignment guarantee, so a record may span any number of chunks and a
//! chunk may carry any number of records.
//!
//! [`FrameReassembler`] buffers the unconsumed suffix of the response
//! and splits it at `}{` boundaries. Fragment boundaries are computed as
//! slice offsets, so the braces shared by adjacent records are never
//! copied or re-attached: the `}` of a separator terminates the
//! preceding fragment and the `{` opens the following one, while the
//! first and last fragment of a response already own their outer brace.
//!
//! Each candidate fragment is decoded against the stream's
//! [`RecordSchema`]. A fragment that fails to decode — malformed JSON,
//! or a closed object missing required members — rolls the consumption
//! point back to the fragment's opening brace and stops until more data
//! arrives. No fragment is ever partially consumed, which makes the
//! emitted record sequence identical for every chunking of the same
//! response text.

use crate::record::{FrameParse, Record, RecordSchema, decode_frame};

/// Incremental reassembler for one streamed history response.
///
/// Create one per response and drop it when the response completes or
/// errors; an aborted load needs no rollback because no partial record
/// is ever committed.
#[derive(Debug)]
pub struct FrameReassembler {
    schema: RecordSchema,
    /// Unconsumed suffix of the response text.
    pending: String,
    /// Bytes durably turned into emitted records.
    consumed: usize,
    /// Records emitted so far.
    emitted: usize,
}

impl FrameReassembler {
    /// Create a reassembler for one response decoding against `schema`.
    pub fn new(schema: RecordSchema) -> Self {
        Self {
            schema,
            pending: String::new(),
            consumed: 0,
            emitted: 0,
        }
    }

    /// Feed the next transport chunk, returning every record it completed.
    ///
    /// May return zero, one, or many records; a record spanning several
    /// chunks is returned by the chunk that closes it.
    pub fn feed(&mut self, chunk: &str) -> Vec<Record> {
        self.pending.push_str(chunk);

        let mut records = Vec::new();
        let mut cursor = 0;
        while cursor < self.pending.len() {
            // The fragment ends after the `}` of the next separator, or
            // at the end of the buffer for the trailing fragment.
            let end = match self.pending[cursor..].find("}{") {
                Some(at) => cursor + at + 1,
                None => self.pending.len(),
            };
            let candidate = &self.pending[cursor..end];
            match decode_frame(candidate, &self.schema) {
                FrameParse::Complete(record) => {
                    records.push(record);
                    cursor = end;
                }
                FrameParse::Incomplete => {
                    tracing::debug!(
                        fragment_len = candidate.len(),
                        "closed frame missing required members, rewinding"
                    );
                    break;
                }
                FrameParse::Malformed => {
                    tracing::trace!(
                        fragment_len = candidate.len(),
                        "partial frame, awaiting more data"
                    );
                    break;
                }
            }
        }

        self.consumed += cursor;
        self.emitted += records.len();
        self.pending.drain(..cursor);
        records
    }

    /// Signal the end of the response.
    ///
    /// Every record is emitted by the `feed` call that completes it, so
    /// this returns nothing extra; leftover text means the response was
    /// truncated mid-frame and is reported once.
    pub fn finalize(self) -> Vec<Record> {
        if !self.pending.is_empty() {
            tracing::warn!(
                leftover = self.pending.len(),
                consumed = self.consumed,
                "response ended mid-frame, dropping trailing bytes"
            );
        }
        Vec::new()
    }

    /// Bytes durably turned into emitted records.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Records emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}
