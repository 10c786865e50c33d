use std::time::Duration;
use thiserror::Error;

/// Errors for a single inbound trade record (feed message or replay row)
#[derive(Debug, Error)]
pub enum TradeParseError {
    #[error("Missing field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("Invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Malformed message: {reason}")]
    Malformed { reason: String },
}

/// Errors that end a feed session
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("No pong received within {timeout:?}")]
    KeepaliveTimeout { timeout: Duration },

    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },
}

/// Errors decoding a cached field map
#[derive(Debug, Error)]
pub enum FeatureDecodeError {
    #[error("Missing feature field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },
}

/// Errors related to the anomaly model artifact and inference
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No model available for {name} (no promoted version, no runs)")]
    Unavailable { name: String },

    #[error("Failed to load model artifact {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Invalid model artifact: {reason}")]
    Invalid { reason: String },

    #[error("Prediction failed: {reason}")]
    Prediction { reason: String },
}
