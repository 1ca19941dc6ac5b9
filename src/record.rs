//! Wire record model and schema-checked frame decoding.
//!
//! The hub writes history and live records as flat JSON objects of
//! numeric and boolean measurements keyed by short wire names (`batP`,
//! `pin`), plus `timestamp` and, on merged streams, `sourceId`.
//!
//! Decoding is schema-checked, not merely syntax-checked: a
//! syntactically closed object that is missing a required member is
//! reported as [`FrameParse::Incomplete`] rather than accepted or
//! rejected outright. The framing layer treats both non-complete states
//! as "partial frame, wait for more data" (see [`crate::reassembler`]);
//! they stay distinct so diagnostics can tell a bad split from a schema
//! mismatch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single decoded measurement value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Numeric measurement (e.g. battery percentage).
    Number(f64),
    /// Boolean measurement (e.g. door pin state).
    Bool(bool),
}

/// Expected JSON type of a measurement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// JSON number, decoded as `f64`.
    Number,
    /// JSON boolean.
    Bool,
}

/// Declares one measurement field of a wire schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Wire key (e.g. `"batP"`).
    pub key: String,
    /// Expected JSON type.
    pub kind: FieldKind,
    /// Whether a frame without this field is incomplete.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Wire schema for one device stream.
///
/// Page variants carry different field sets over the same framing, so
/// the schema is data handed to the reassembler, not code.
#[derive(Debug, Clone, Default)]
pub struct RecordSchema {
    /// Whether frames must carry a `sourceId` member (merged streams
    /// and live deltas). Per-source history responses leave attribution
    /// to the request and may omit it.
    pub require_source_id: bool,
    /// Measurement fields.
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create an empty schema.
    pub fn new(require_source_id: bool) -> Self {
        Self {
            require_source_id,
            fields: Vec::new(),
        }
    }

    /// Add a required measurement field.
    pub fn with_field(mut self, key: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            key: key.into(),
            kind,
            required: true,
        });
        self
    }

    /// Add an optional measurement field.
    pub fn with_optional_field(mut self, key: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            key: key.into(),
            kind,
            required: false,
        });
        self
    }
}

/// The atomic decoded unit of the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Source index on merged streams; `None` when the stream is
    /// per-source and attribution comes from the request.
    pub source_id: Option<usize>,
    /// Measurement values keyed by wire name.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Timestamp as UTC wall-clock time, for logs and display.
    ///
    /// `None` only for timestamps outside chrono's representable range.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Tri-state result of decoding one candidate frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameParse {
    /// All required members present; the record is ready to emit.
    Complete(Record),
    /// Valid JSON that does not satisfy the schema. Either the chunk
    /// boundary guess was wrong or the device disagrees about the wire
    /// schema; in both cases the only consumption-safe response is to
    /// wait for more data.
    Incomplete,
    /// Not valid JSON. The frame is still arriving.
    Malformed,
}

/// Decode one candidate frame against `schema`.
///
/// Numeric and boolean members other than `timestamp`/`sourceId` are
/// captured into the record's field map whether or not the schema names
/// them; strings, nulls and nested values are not measurements and are
/// ignored.
pub fn decode_frame(text: &str, schema: &RecordSchema) -> FrameParse {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return FrameParse::Malformed,
    };
    let Some(object) = value.as_object() else {
        return FrameParse::Incomplete;
    };

    let Some(timestamp) = object.get("timestamp").and_then(|v| v.as_i64()) else {
        return FrameParse::Incomplete;
    };
    let source_id = object
        .get("sourceId")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize);
    if schema.require_source_id && source_id.is_none() {
        return FrameParse::Incomplete;
    }

    let mut fields = BTreeMap::new();
    for (key, member) in object {
        if key == "timestamp" || key == "sourceId" {
            continue;
        }
        match member {
            serde_json::Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    fields.insert(key.clone(), FieldValue::Number(f));
                }
            }
            serde_json::Value::Bool(b) => {
                fields.insert(key.clone(), FieldValue::Bool(*b));
            }
            _ => {}
        }
    }

    for spec in &schema.fields {
        if !spec.required {
            continue;
        }
        match fields.get(&spec.key) {
            Some(FieldValue::Number(_)) if spec.kind == FieldKind::Number => {}
            Some(FieldValue::Bool(_)) if spec.kind == FieldKind::Bool => {}
            _ => return FrameParse::Incomplete,
        }
    }

    FrameParse::Complete(Record {
        timestamp,
        source_id,
        fields,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn battery_schema() -> RecordSchema {
        RecordSchema::new(false)
            .with_field("batP", FieldKind::Number)
            .with_optional_field("pin", FieldKind::Bool)
    }

    #[test]
    fn decode_complete_record() {
        let parse = decode_frame(r#"{"timestamp":1712,"batP":71.5,"pin":true}"#, &battery_schema());
        let FrameParse::Complete(record) = parse else {
            panic!("expected complete parse, got {parse:?}");
        };
        assert_eq!(record.timestamp, 1712);
        assert_eq!(record.source_id, None);
        assert_eq!(record.fields.get("batP"), Some(&FieldValue::Number(71.5)));
        assert_eq!(record.fields.get("pin"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn decode_optional_field_absent() {
        let parse = decode_frame(r#"{"timestamp":1,"batP":50}"#, &battery_schema());
        assert!(matches!(parse, FrameParse::Complete(_)));
    }

    #[test]
    fn decode_missing_required_field_is_incomplete() {
        let parse = decode_frame(r#"{"timestamp":1,"pin":false}"#, &battery_schema());
        assert_eq!(parse, FrameParse::Incomplete);
    }

    #[test]
    fn decode_missing_timestamp_is_incomplete() {
        let parse = decode_frame(r#"{"batP":50}"#, &battery_schema());
        assert_eq!(parse, FrameParse::Incomplete);
    }

    #[test]
    fn decode_wrong_type_is_incomplete() {
        let parse = decode_frame(r#"{"timestamp":1,"batP":"high"}"#, &battery_schema());
        assert_eq!(parse, FrameParse::Incomplete);
    }

    #[test]
    fn decode_truncated_json_is_malformed() {
        let parse = decode_frame(r#"{"timestamp":1,"batP":5"#, &battery_schema());
        assert_eq!(parse, FrameParse::Malformed);
    }

    #[test]
    fn decode_non_object_is_incomplete() {
        let parse = decode_frame("42", &battery_schema());
        assert_eq!(parse, FrameParse::Incomplete);
    }

    #[test]
    fn decode_source_id_required() {
        let schema = RecordSchema::new(true).with_field("batP", FieldKind::Number);
        let without = decode_frame(r#"{"timestamp":1,"batP":50}"#, &schema);
        assert_eq!(without, FrameParse::Incomplete);

        let with = decode_frame(r#"{"timestamp":1,"sourceId":1,"batP":50}"#, &schema);
        let FrameParse::Complete(record) = with else {
            panic!("expected complete parse");
        };
        assert_eq!(record.source_id, Some(1));
    }

    #[test]
    fn decode_captures_unlisted_measurements() {
        let parse = decode_frame(
            r#"{"timestamp":1,"batP":50,"rssi":-67,"fw":"1.2.0"}"#,
            &battery_schema(),
        );
        let FrameParse::Complete(record) = parse else {
            panic!("expected complete parse");
        };
        assert_eq!(record.fields.get("rssi"), Some(&FieldValue::Number(-67.0)));
        // strings are not measurements
        assert!(!record.fields.contains_key("fw"));
    }

    #[test]
    fn timestamp_utc_renders_epoch_seconds() {
        let record = Record {
            timestamp: 0,
            source_id: None,
            fields: BTreeMap::new(),
        };
        let utc = record.timestamp_utc().map(|t| t.to_rfc3339());
        assert_eq!(utc.as_deref(), Some("1970-01-01T00:00:00+00:00"));
    }

    #[test]
    fn field_spec_required_defaults_to_true() {
        let spec: FieldSpec = toml::from_str(r#"key = "batP"
kind = "number""#)
            .unwrap_or_else(|e| panic!("spec should deserialize: {e}"));
        assert!(spec.required);
    }
}
