//! Error types for Spread Pulse

use thiserror::Error;

/// Errors that can occur during ingestion and aggregation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid ingestion payload: {0}")]
    InvalidPayload(String),

    #[error("Unsupported stats window: {0} days (expected 7, 14 or 30)")]
    InvalidWindow(u32),

    #[error("Event store error: {0}")]
    Store(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while handing a batch to the delivery transport.
///
/// These never reach callers of `Collector::track`; the collector logs them and
/// re-queues the batch.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Beacon rejected by host")]
    BeaconRejected,

    #[error("Network request failed: {0}")]
    Network(String),
}

/// Errors raised by tab-scoped session storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt session value for key {key}: {value}")]
    Corrupt { key: String, value: String },
}
