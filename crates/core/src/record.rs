//! Persisted message records.
//!
//! A [`StoredMessage`] is the flat, source-agnostic row kept by the message
//! log. Ingestion adapters produce them; tree building replays them.

use serde::{Deserialize, Serialize};

/// Role recorded at ingestion time. Tree building re-derives perspective from
/// `sender_id`, so this is informational.
pub const ROLE_SELF: &str = "self";
pub const ROLE_USER: &str = "user";

/// A single row of the message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Globally unique message ID (e.g. `tg:<chat>:<message>`)
    pub id: String,

    /// Where the message came from (e.g. "telegram", "mock")
    pub source: String,

    /// Logical scope the message belongs to
    pub channel: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,

    /// Platform-specific user ID
    pub sender_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    #[serde(default = "default_role")]
    pub sender_role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,

    pub content: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Epoch milliseconds
    pub timestamp: i64,

    /// Source-specific metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_meta: Option<serde_json::Value>,
}

fn default_role() -> String {
    ROLE_USER.into()
}

fn default_content_type() -> String {
    "text".into()
}

impl StoredMessage {
    /// A text message with the given scope and sender; optional fields empty.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            channel: channel.into(),
            chat_id: None,
            topic_id: None,
            sender_id: sender_id.into(),
            sender_name: None,
            sender_role: default_role(),
            reply_to_id: None,
            content: content.into(),
            content_type: default_content_type(),
            timestamp,
            raw_meta: None,
        }
    }

    pub fn replying_to(mut self, reply_to_id: impl Into<String>) -> Self {
        self.reply_to_id = Some(reply_to_id.into());
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// The scope this record is filed under: explicit channel, else topic,
    /// else chat.
    pub fn scope(&self) -> &str {
        if !self.channel.is_empty() {
            return &self.channel;
        }
        self.topic_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.chat_id.as_deref())
            .unwrap_or_default()
    }
}

/// Body item of the generic ingest endpoint. Every field is optional on the
/// wire; incomplete items are skipped rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub id: Option<String>,
    pub source: Option<String>,
    pub channel: Option<String>,
    pub chat_id: Option<serde_json::Value>,
    pub topic_id: Option<serde_json::Value>,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub sender_role: Option<String>,
    pub reply_to_id: Option<String>,
    pub content: Option<String>,
    pub content_type: Option<String>,
    pub timestamp: Option<i64>,
    pub raw_meta: Option<serde_json::Value>,
}

impl IngestRequest {
    /// Convert into a record, or `None` when a required field is missing or empty.
    pub fn into_record(self) -> Option<StoredMessage> {
        fn required(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.is_empty())
        }

        let timestamp = self.timestamp.filter(|&t| t != 0)?;
        Some(StoredMessage {
            id: required(self.id)?,
            source: required(self.source)?,
            channel: required(self.channel)?,
            chat_id: self.chat_id.and_then(id_string),
            topic_id: self.topic_id.and_then(id_string),
            sender_id: required(self.sender_id)?,
            sender_name: self.sender_name,
            sender_role: self.sender_role.unwrap_or_else(default_role),
            reply_to_id: self.reply_to_id.filter(|s| !s.is_empty()),
            content: required(self.content)?,
            content_type: self.content_type.unwrap_or_else(default_content_type),
            timestamp,
            raw_meta: self.raw_meta,
        })
    }
}

/// Platform IDs arrive as numbers or strings; normalize to a non-empty string.
pub fn id_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
