//! Error types for the Knowledge Portal domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Storage and ingestion have their own error enums.

use thiserror::Error;

/// The top-level error type for all portal operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Layer tree errors ---
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Unrecognized action kind: {0}")]
    UnrecognizedAction(String),

    #[error("Message already placed: {0}")]
    DuplicateMessage(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Platform API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Storage error during ingestion: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_layer_displays_id() {
        let err = Error::UnknownLayer("ZZ".into());
        assert_eq!(err.to_string(), "Unknown layer: ZZ");
    }

    #[test]
    fn duplicate_message_displays_id() {
        let err = Error::DuplicateMessage("tg:1:7".into());
        assert_eq!(err.to_string(), "Message already placed: tg:1:7");
    }

    #[test]
    fn channel_error_wraps_storage() {
        let err: ChannelError = StorageError::Storage("disk full".into()).into();
        assert!(err.to_string().contains("disk full"));
    }
}
