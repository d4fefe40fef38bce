//! Error types for the playback engine

use thiserror::Error;

/// Playback errors
///
/// These surface at the collaborator trait boundaries (audio backend,
/// key-value store). The engine itself never propagates them out of a
/// public operation; failed commands are logged and degrade to no-ops.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Configured base URL is not a valid http(s) origin
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// Audio backend failed to load or drive a resource
    #[error("audio backend error: {0}")]
    Backend(String),

    /// Key-value store read/write failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Stored data could not be encoded/decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;
