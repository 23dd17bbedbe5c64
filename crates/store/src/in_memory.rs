//! In-memory message log — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use portal_core::error::StorageError;
use portal_core::record::StoredMessage;
use portal_core::storage::MessageStore;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Insertion order; ties on timestamp keep it.
    messages: Vec<StoredMessage>,
    by_id: HashMap<String, usize>,
    state: HashMap<String, String>,
}

impl Inner {
    fn upsert(&mut self, record: StoredMessage) {
        match self.by_id.get(&record.id) {
            Some(&idx) => merge(&mut self.messages[idx], record),
            None => {
                self.by_id.insert(record.id.clone(), self.messages.len());
                self.messages.push(record);
            }
        }
    }
}

/// Apply the upsert rules shared with the SQLite backend.
fn merge(existing: &mut StoredMessage, incoming: StoredMessage) {
    existing.channel = incoming.channel;
    if incoming.raw_meta.is_some() {
        existing.raw_meta = incoming.raw_meta;
    }
    if existing.chat_id.is_none() {
        existing.chat_id = incoming.chat_id;
    }
    if existing.topic_id.is_none() {
        existing.topic_id = incoming.topic_id;
    }
}

/// A message log kept in process memory.
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn in_scope(record: &StoredMessage, channel: &str) -> bool {
    record.channel == channel
        || record.topic_id.as_deref() == Some(channel)
        || record.chat_id.as_deref() == Some(channel)
}

#[async_trait]
impl MessageStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: StoredMessage) -> Result<(), StorageError> {
        self.inner.write().await.upsert(record);
        Ok(())
    }

    async fn insert_batch(&self, records: Vec<StoredMessage>) -> Result<usize, StorageError> {
        let count = records.len();
        let mut inner = self.inner.write().await;
        for record in records {
            inner.upsert(record);
        }
        Ok(count)
    }

    async fn messages(&self, source: &str, channel: &str) -> Result<Vec<StoredMessage>, StorageError> {
        let inner = self.inner.read().await;
        let mut found: Vec<StoredMessage> = inner
            .messages
            .iter()
            .filter(|m| m.source == source && in_scope(m, channel))
            .cloned()
            .collect();
        found.sort_by_key(|m| m.timestamp);
        Ok(found)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredMessage>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(id).map(|&idx| inner.messages[idx].clone()))
    }

    async fn channels(&self, source: &str) -> Result<Vec<String>, StorageError> {
        let inner = self.inner.read().await;
        let scopes: BTreeSet<String> = inner
            .messages
            .iter()
            .filter(|m| m.source == source)
            .map(|m| {
                m.topic_id
                    .clone()
                    .or_else(|| m.chat_id.clone())
                    .unwrap_or_else(|| m.channel.clone())
            })
            .collect();
        Ok(scopes.into_iter().collect())
    }

    async fn sources(&self) -> Result<Vec<String>, StorageError> {
        let inner = self.inner.read().await;
        let sources: BTreeSet<String> = inner.messages.iter().map(|m| m.source.clone()).collect();
        Ok(sources.into_iter().collect())
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.read().await.state.get(key).cloned())
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner
            .write()
            .await
            .state
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, channel: &str, ts: i64) -> StoredMessage {
        StoredMessage::new(id, "mock", channel, "larry", format!("text {id}"), ts)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryStore::new();
        store.insert(msg("1", "design", 10)).await.unwrap();
        let fetched = store.get("1").await.unwrap().unwrap();
        assert_eq!(fetched.content, "text 1");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn messages_are_ordered_by_timestamp() {
        let store = InMemoryStore::new();
        store
            .insert_batch(vec![msg("b", "design", 20), msg("a", "design", 10), msg("c", "other", 5)])
            .await
            .unwrap();
        let ids: Vec<String> = store
            .messages("mock", "design")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn upsert_merges_instead_of_duplicating() {
        let store = InMemoryStore::new();
        let mut first = msg("1", "old", 10);
        first.chat_id = Some("-100".into());
        store.insert(first).await.unwrap();

        let mut second = msg("1", "new", 10);
        second.chat_id = Some("-200".into());
        second.topic_id = Some("7".into());
        second.content = "edited".into();
        second.raw_meta = Some(serde_json::json!({"message_id": 1}));
        store.insert(second).await.unwrap();

        let merged = store.get("1").await.unwrap().unwrap();
        assert_eq!(merged.channel, "new");
        assert_eq!(merged.chat_id.as_deref(), Some("-100"));
        assert_eq!(merged.topic_id.as_deref(), Some("7"));
        assert_eq!(merged.content, "text 1");
        assert!(merged.raw_meta.is_some());
        assert_eq!(store.messages("mock", "new").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn channels_prefer_topic_then_chat() {
        let store = InMemoryStore::new();
        let mut topical = msg("1", "x", 1);
        topical.chat_id = Some("-100".into());
        topical.topic_id = Some("42".into());
        let mut chat = msg("2", "y", 2);
        chat.chat_id = Some("-100".into());
        store
            .insert_batch(vec![topical, chat, msg("3", "design", 3)])
            .await
            .unwrap();

        assert_eq!(
            store.channels("mock").await.unwrap(),
            vec!["-100", "42", "design"]
        );
        assert_eq!(store.messages("mock", "-100").await.unwrap().len(), 2);
        assert_eq!(store.sources().await.unwrap(), vec!["mock"]);
    }

    #[tokio::test]
    async fn state_round_trip() {
        let store = InMemoryStore::new();
        assert!(store.get_state("offset").await.unwrap().is_none());
        store.set_state("offset", "41").await.unwrap();
        store.set_state("offset", "42").await.unwrap();
        assert_eq!(store.get_state("offset").await.unwrap().as_deref(), Some("42"));
    }
}
