//! Message log trait — the flat store trees are rebuilt from.
//!
//! Implementations: SQLite and in-memory (for testing), both in
//! `portal-store`. The layer-tree engine never touches storage directly.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::StoredMessage;

/// The core MessageStore trait.
///
/// Inserts are idempotent by message ID. On conflict `channel` and `raw_meta`
/// take the new value when present, `chat_id` and `topic_id` keep an existing
/// value, and every other column stays as first written.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Insert or merge a single record.
    async fn insert(&self, record: StoredMessage) -> Result<(), StorageError>;

    /// Insert many records, atomically where the backend supports it.
    async fn insert_batch(&self, records: Vec<StoredMessage>) -> Result<usize, StorageError>;

    /// All messages in `channel` for `source`, oldest first. A record matches
    /// when its channel, topic or chat equals `channel`.
    async fn messages(&self, source: &str, channel: &str) -> Result<Vec<StoredMessage>, StorageError>;

    /// Get a single message by ID.
    async fn get(&self, id: &str) -> Result<Option<StoredMessage>, StorageError>;

    /// Distinct scopes (topic, else chat, else channel) for a source, sorted.
    async fn channels(&self, source: &str) -> Result<Vec<String>, StorageError>;

    /// Distinct sources, sorted.
    async fn sources(&self) -> Result<Vec<String>, StorageError>;

    /// Read an ingestion checkpoint (e.g. the Telegram update offset).
    async fn get_state(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write an ingestion checkpoint.
    async fn set_state(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
