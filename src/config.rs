//! Configuration types for the ingestion client.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::record::{FieldKind, FieldSpec, RecordSchema};

/// Top-level configuration for a hub ingestion session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Device endpoints.
    pub device: DeviceConfig,
    /// Sensor topology and wire schema.
    pub sensors: SensorConfig,
    /// Live event channel behavior.
    pub live: LiveConfig,
}

impl HubConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| IngestError::Config(format!("{}: {e}", path.display())))
    }
}

/// Device endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base URL of the hub (the indoor station's web server).
    pub base_url: String,
    /// Path of the streamed history endpoint.
    pub history_path: String,
    /// Path of the SSE event channel.
    pub events_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.4.1".to_owned(),
            history_path: "/get_data".to_owned(),
            events_path: "/events".to_owned(),
        }
    }
}

/// Sensor topology and wire schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Number of paired sensors; source indices are `0..count`.
    pub count: usize,
    /// Measurement fields carried by each record.
    pub fields: Vec<FieldSpec>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        // Matches the hub firmware: battery percentage and door pin
        // state for two pairable sensors.
        Self {
            count: 2,
            fields: vec![
                FieldSpec {
                    key: "batP".to_owned(),
                    kind: FieldKind::Number,
                    required: true,
                },
                FieldSpec {
                    key: "pin".to_owned(),
                    kind: FieldKind::Bool,
                    required: true,
                },
            ],
        }
    }
}

impl SensorConfig {
    /// Schema for per-source history responses (`sourceId` optional).
    pub fn history_schema(&self) -> RecordSchema {
        RecordSchema {
            require_source_id: false,
            fields: self.fields.clone(),
        }
    }

    /// Schema for live deltas, which must carry `sourceId`.
    pub fn live_schema(&self) -> RecordSchema {
        RecordSchema {
            require_source_id: true,
            fields: self.fields.clone(),
        }
    }
}

/// Live event channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Seconds to wait before re-opening a dropped event channel.
    pub reconnect_delay_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 5,
        }
    }
}
