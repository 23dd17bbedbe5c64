//! Telegram adapter.
//!
//! Converts Bot API `Message` objects into [`StoredMessage`] records and
//! writes them to the message log. Knows nothing about layers or trees.

use std::sync::Arc;

use portal_core::error::ChannelError;
use portal_core::record::{ROLE_SELF, ROLE_USER, StoredMessage};
use portal_core::storage::MessageStore;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Source tag for everything ingested from Telegram.
pub const SOURCE: &str = "telegram";

/// The subset of a Bot API `Message` the portal uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TgMessage {
    #[serde(default)]
    pub message_id: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(default)]
    pub chat: Option<TgChat>,
    #[serde(default)]
    pub from: Option<TgUser>,
    /// Forum topic the message belongs to
    #[serde(default)]
    pub message_thread_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Writes Telegram messages into a [`MessageStore`].
pub struct TelegramAdapter {
    store: Arc<dyn MessageStore>,
    /// Messages from this user are recorded with role "self"
    self_user_id: Option<String>,
}

impl TelegramAdapter {
    pub fn new(store: Arc<dyn MessageStore>, self_user_id: Option<String>) -> Self {
        Self {
            store,
            self_user_id: self_user_id.filter(|id| !id.is_empty()),
        }
    }

    /// Convert one message. Returns `None` when it has no `message_id`.
    ///
    /// The channel is `channel_override` if given, else the forum topic, else
    /// the chat.
    pub fn transform(&self, msg: &TgMessage, channel_override: Option<&str>) -> Option<StoredMessage> {
        let message_id = msg.message_id.filter(|&id| id != 0)?;

        let chat_id = msg.chat.as_ref().map(|c| c.id.to_string()).unwrap_or_default();
        let topic_id = msg.message_thread_id.map(|t| t.to_string());
        let channel = channel_override
            .filter(|c| !c.is_empty())
            .map(String::from)
            .or_else(|| topic_id.clone())
            .unwrap_or_else(|| chat_id.clone());

        let sender_id = msg.from.as_ref().map(|u| u.id.to_string()).unwrap_or_default();
        let sender_name = msg.from.as_ref().and_then(display_name);
        let sender_role = if self.self_user_id.as_deref() == Some(sender_id.as_str()) {
            ROLE_SELF
        } else {
            ROLE_USER
        };

        let reply_msg_id = msg.reply_to_message.as_ref().and_then(|r| r.message_id);
        let (content, content_type) = match (&msg.text, &msg.caption) {
            (Some(text), _) if !text.is_empty() => (text.clone(), "text"),
            (_, caption) => {
                let content = caption
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "[media]".to_string());
                let kind = if msg.photo.is_some() { "image" } else { "other" };
                (content, kind)
            }
        };

        Some(StoredMessage {
            id: format!("tg:{chat_id}:{message_id}"),
            source: SOURCE.to_string(),
            channel,
            chat_id: Some(chat_id.clone()).filter(|c| !c.is_empty()),
            topic_id,
            sender_id,
            sender_name,
            sender_role: sender_role.to_string(),
            reply_to_id: reply_msg_id.map(|r| format!("tg:{chat_id}:{r}")),
            content,
            content_type: content_type.to_string(),
            timestamp: msg.date.unwrap_or(0) * 1000,
            raw_meta: Some(json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "message_thread_id": msg.message_thread_id,
                "reply_to_msg_id": reply_msg_id,
            })),
        })
    }

    /// Store `msg`, storing the message it replies to first when Telegram
    /// embedded it, so reply targets exist even if never seen as updates.
    pub async fn ingest(
        &self,
        msg: &TgMessage,
        channel_override: Option<&str>,
    ) -> Result<Option<StoredMessage>, ChannelError> {
        if let Some(parent) = msg
            .reply_to_message
            .as_deref()
            .and_then(|p| self.transform(p, channel_override))
        {
            self.store.insert(parent).await?;
        }

        let Some(record) = self.transform(msg, channel_override) else {
            debug!("Skipping Telegram message without message_id");
            return Ok(None);
        };
        self.store.insert(record.clone()).await?;
        Ok(Some(record))
    }

    /// Convert and store many messages in one batch. Returns how many were stored.
    pub async fn ingest_batch(
        &self,
        msgs: &[TgMessage],
        channel_override: Option<&str>,
    ) -> Result<usize, ChannelError> {
        let records: Vec<StoredMessage> = msgs
            .iter()
            .filter_map(|m| self.transform(m, channel_override))
            .collect();
        if records.is_empty() {
            return Ok(0);
        }
        Ok(self.store.insert_batch(records).await?)
    }
}

fn display_name(user: &TgUser) -> Option<String> {
    let parts: Vec<&str> = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_store::InMemoryStore;

    fn adapter() -> (TelegramAdapter, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (TelegramAdapter::new(store.clone(), Some("111".into())), store)
    }

    fn tg(value: serde_json::Value) -> TgMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn transforms_text_message() {
        let (adapter, _) = adapter();
        let msg = tg(json!({
            "message_id": 7,
            "date": 1700000000,
            "chat": {"id": -100123},
            "from": {"id": 111, "first_name": "Larry", "last_name": "Page"},
            "text": "hello"
        }));
        let record = adapter.transform(&msg, None).unwrap();
        assert_eq!(record.id, "tg:-100123:7");
        assert_eq!(record.source, "telegram");
        assert_eq!(record.channel, "-100123");
        assert_eq!(record.chat_id.as_deref(), Some("-100123"));
        assert_eq!(record.sender_id, "111");
        assert_eq!(record.sender_name.as_deref(), Some("Larry Page"));
        assert_eq!(record.sender_role, "self");
        assert_eq!(record.content, "hello");
        assert_eq!(record.content_type, "text");
        assert_eq!(record.timestamp, 1_700_000_000_000);
        assert!(record.reply_to_id.is_none());
        let meta = record.raw_meta.unwrap();
        assert_eq!(meta["chat_id"], "-100123");
        assert_eq!(meta["message_id"], 7);
        assert!(meta["message_thread_id"].is_null());
    }

    #[test]
    fn topic_and_override_pick_channel() {
        let (adapter, _) = adapter();
        let msg = tg(json!({
            "message_id": 1, "date": 1, "chat": {"id": -5}, "message_thread_id": 42,
            "from": {"id": 9, "first_name": "Eve"}, "text": "x"
        }));
        let record = adapter.transform(&msg, None).unwrap();
        assert_eq!(record.channel, "42");
        assert_eq!(record.topic_id.as_deref(), Some("42"));
        assert_eq!(record.sender_role, "user");
        assert_eq!(record.sender_name.as_deref(), Some("Eve"));

        let record = adapter.transform(&msg, Some("design")).unwrap();
        assert_eq!(record.channel, "design");
    }

    #[test]
    fn media_and_caption_content() {
        let (adapter, _) = adapter();
        let photo = tg(json!({
            "message_id": 2, "date": 1, "chat": {"id": 1}, "from": {"id": 2},
            "photo": [{"file_id": "abc"}], "caption": "look"
        }));
        let record = adapter.transform(&photo, None).unwrap();
        assert_eq!(record.content, "look");
        assert_eq!(record.content_type, "image");

        let sticker = tg(json!({"message_id": 3, "date": 1, "chat": {"id": 1}, "from": {"id": 2}}));
        let record = adapter.transform(&sticker, None).unwrap();
        assert_eq!(record.content, "[media]");
        assert_eq!(record.content_type, "other");
        assert!(record.sender_name.is_none());
    }

    #[test]
    fn message_without_id_is_skipped() {
        let (adapter, _) = adapter();
        let msg = tg(json!({"date": 1, "chat": {"id": 1}, "text": "x"}));
        assert!(adapter.transform(&msg, None).is_none());
    }

    #[tokio::test]
    async fn ingest_stores_reply_target_first() {
        let (adapter, store) = adapter();
        let msg = tg(json!({
            "message_id": 11, "date": 2, "chat": {"id": -1}, "from": {"id": 111}, "text": "reply",
            "reply_to_message": {
                "message_id": 10, "date": 1, "chat": {"id": -1}, "from": {"id": 222}, "text": "original"
            }
        }));
        let stored = adapter.ingest(&msg, None).await.unwrap().unwrap();
        assert_eq!(stored.reply_to_id.as_deref(), Some("tg:-1:10"));

        let parent = store.get("tg:-1:10").await.unwrap().unwrap();
        assert_eq!(parent.content, "original");
        assert_eq!(parent.sender_role, "user");
        assert_eq!(store.messages("telegram", "-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn ingest_batch_counts_valid_messages() {
        let (adapter, store) = adapter();
        let msgs = vec![
            tg(json!({"message_id": 1, "date": 1, "chat": {"id": 5}, "from": {"id": 1}, "text": "a"})),
            tg(json!({"date": 2, "chat": {"id": 5}, "text": "no id"})),
            tg(json!({"message_id": 2, "date": 3, "chat": {"id": 5}, "from": {"id": 1}, "text": "b"})),
        ];
        assert_eq!(adapter.ingest_batch(&msgs, None).await.unwrap(), 2);
        assert_eq!(store.messages("telegram", "5").await.unwrap().len(), 2);
        assert_eq!(adapter.ingest_batch(&[], None).await.unwrap(), 0);
    }
}
