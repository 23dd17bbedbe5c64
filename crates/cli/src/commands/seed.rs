//! `portal seed` — Populate a store with a mock conversation.
//!
//! Larry (the viewer) talks with a bot in `mock/design-chat`. The exchange
//! exercises all three placements: plain messages append, replies to the
//! bot branch, and Larry replying to himself jumps back.

use std::sync::Arc;

use portal_config::AppConfig;
use portal_core::record::{ROLE_SELF, ROLE_USER};
use portal_core::{MessageStore, StoredMessage};
use portal_store::SqliteStore;

use super::{CmdResult, open_store};

pub const SOURCE: &str = "mock";
pub const CHANNEL: &str = "design-chat";

const CONVERSATION: &[(&str, Option<&str>, &str)] = &[
    // Layer A: top-level design discussion
    ("larry", None, "Let's design the knowledge portal architecture"),
    ("bot", None, "Sure. Keep persistence apart from display: the store holds flat messages and the navigator builds the hierarchy at query time."),
    ("larry", None, "What about the tech stack?"),
    ("bot", None, "Rust with SQLite and an HTTP gateway. The tree engine has no I/O so any client can embed it."),
    // Layer B: reply to the bot's architecture answer
    ("larry", Some("mock:2"), "Tell me more about the navigator. How does branching work?"),
    ("bot", None, "Replying to someone else's message opens a sub-layer. Replying to your own message jumps back to its layer."),
    ("larry", None, "Got it. And the navigation strategy is pluggable?"),
    ("bot", None, "Yes, the default strategy can be swapped for any custom logic."),
    // Layer C: deeper branch from the strategy answer
    ("larry", Some("mock:8"), "What would an alternative strategy look like?"),
    ("bot", None, "A flat strategy that ignores replies entirely, or a thread strategy that branches on every reply regardless of sender."),
    // Back to A: Larry replies to his own question
    ("larry", Some("mock:3"), "Actually, let's also discuss the database schema"),
    ("bot", None, "A single flat messages table, source-agnostic, with reply_to_id for linking. No tree logic in the database."),
    // Layer D: branch from the schema answer
    ("larry", Some("mock:12"), "Should we add a separate table for channels and sources?"),
    ("bot", None, "Not yet. They can be derived from the messages table."),
];

/// The mock conversation as stored records, one second apart.
pub fn mock_conversation() -> Vec<StoredMessage> {
    CONVERSATION
        .iter()
        .enumerate()
        .map(|(i, (sender, reply_to, content))| {
            let n = i + 1;
            let (name, role) = if *sender == "larry" {
                ("Larry", ROLE_SELF)
            } else {
                ("Bot", ROLE_USER)
            };
            let mut record = StoredMessage::new(
                format!("mock:{n}"),
                SOURCE,
                CHANNEL,
                *sender,
                *content,
                n as i64 * 1000,
            )
            .with_sender_name(name);
            record.sender_role = role.to_string();
            record.reply_to_id = reply_to.map(String::from);
            record
        })
        .collect()
}

pub async fn run(config: AppConfig, db: Option<String>) -> CmdResult {
    let store: Arc<dyn MessageStore> = match db {
        Some(path) => Arc::new(SqliteStore::new(&path).await?),
        None => open_store(&config).await?,
    };

    let count = store.insert_batch(mock_conversation()).await?;
    println!("✅ Seeded {count} mock messages into {SOURCE}/{CHANNEL} ({})", store.name());
    println!("   Try: portal tree {SOURCE} {CHANNEL}");
    Ok(())
}
