//! Message domain types consumed by the layer-tree engine.
//!
//! A [`Message`] is the canonical, platform-agnostic shape the navigator
//! works on. Content is opaque to the engine and carried as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who sent a message, relative to the viewer the tree is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The viewer
    #[serde(rename = "self")]
    Viewer,
    /// Any other human participant
    Other,
    /// An automated participant; bot answers never open branches
    Bot,
    /// A caller-defined tag understood by a custom strategy. Tags equal to a
    /// built-in name (`self`, `other`, `bot`) mean that built-in; the
    /// navigator stores them as such.
    #[serde(untagged)]
    Custom(String),
}

impl Sender {
    pub fn as_str(&self) -> &str {
        match self {
            Sender::Viewer => "self",
            Sender::Other => "other",
            Sender::Bot => "bot",
            Sender::Custom(tag) => tag,
        }
    }

    /// Fold a `Custom` tag that spells a built-in name into that variant.
    pub fn canonical(self) -> Sender {
        match self {
            Sender::Custom(tag) => Sender::from(tag.as_str()),
            builtin => builtin,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Sender::Bot)
    }
}

impl From<&str> for Sender {
    fn from(tag: &str) -> Self {
        match tag {
            "self" => Sender::Viewer,
            "other" => Sender::Other,
            "bot" => Sender::Bot,
            custom => Sender::Custom(custom.to_string()),
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message placed into the layer tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique, caller-assigned message ID
    pub id: String,

    /// Who sent this message
    pub sender: Sender,

    /// Opaque payload
    #[serde(default)]
    pub content: serde_json::Value,

    /// Epoch milliseconds, caller-assigned
    pub timestamp: i64,

    /// ID of the message this one replies to
    #[serde(default)]
    pub reply_to_id: Option<String>,
}

impl Message {
    /// Create a plain (non-reply) message.
    pub fn new(
        id: impl Into<String>,
        sender: Sender,
        content: impl Into<serde_json::Value>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            sender,
            content: content.into(),
            timestamp,
            reply_to_id: None,
        }
    }

    /// Mark this message as a reply to `reply_to_id`.
    pub fn replying_to(mut self, reply_to_id: impl Into<String>) -> Self {
        self.reply_to_id = Some(reply_to_id.into());
        self
    }
}
