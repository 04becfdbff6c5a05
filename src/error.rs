//! Error handling for record ingestion and configuration validation.
//!
//! The analysis pipeline itself never fails: missing data is a filtering
//! outcome and "no result" is an empty list or `None`. Errors only arise
//! at the edges, when raw store payloads are parsed into typed records or
//! when a caller builds a nonsensical configuration.

use thiserror::Error;

/// Errors produced at the ingestion/configuration boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A store payload could not be parsed into typed records.
    #[error("invalid record payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// A configuration value would make the computation degenerate.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for ingestion and validation operations.
pub type Result<T> = std::result::Result<T, Error>;
