//! Error types for the ingestion pipeline.

/// Top-level error type for the sensor-history ingestion client.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// HTTP transport error (connect, request, status).
    #[error("transport error: {0}")]
    Transport(String),

    /// Streamed response body error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Series store error.
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, IngestError>;
