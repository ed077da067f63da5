use std::io;
use thiserror::Error;

/// Unified error type for the dochat library
#[derive(Error, Debug)]
pub enum DochatError {
    /// Empty submission: no attachments and no text
    #[error("Validation error: {0}")]
    Validation(String),

    /// Attachment could not be read or decoded; fatal to the whole send
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// API-related errors (model provider rejected or misbehaved)
    #[error("API error: {0}")]
    Api(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),

    /// Internal misuse, e.g. applying a chunk to a non-streaming turn
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Stream abandoned by the owner; a cancelled session is terminal and
    /// refuses further sends. Silent, never shown as an error
    #[error("Cancelled")]
    Cancelled,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Requested document or preview does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl From<reqwest::Error> for DochatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DochatError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            DochatError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            DochatError::Api(format!("API returned error status: {}", err))
        } else {
            DochatError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for DochatError {
    fn from(err: serde_json::Error) -> Self {
        DochatError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for DochatError {
    fn from(err: serde_yml::Error) -> Self {
        DochatError::Serialization(format!("YAML error: {}", err))
    }
}
