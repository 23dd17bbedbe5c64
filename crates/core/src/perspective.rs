//! Perspective — whose point of view a tree is built from.
//!
//! Stored records carry raw platform sender IDs. Branch and jump rules depend
//! on whether a message came from the viewer, another person, or a bot, so
//! records are classified relative to a viewer before replay.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::Result;
use crate::message::{Message, Sender};
use crate::navigator::TreeNavigator;
use crate::record::StoredMessage;
use crate::strategy::NavigationStrategy;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Perspective {
    /// Sender ID treated as `self`. When unset, the most active sender is used.
    pub viewer_id: Option<String>,
    /// Sender IDs treated as bots.
    pub bot_ids: HashSet<String>,
}

impl Perspective {
    pub fn new(viewer_id: Option<String>, bot_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            viewer_id,
            bot_ids: bot_ids.into_iter().collect(),
        }
    }

    /// Pin the viewer for `records`, falling back to the most frequent sender
    /// (earliest first appearance wins ties).
    pub fn resolve(&self, records: &[StoredMessage]) -> Perspective {
        Perspective {
            viewer_id: self
                .viewer_id
                .clone()
                .or_else(|| most_frequent_sender(records)),
            bot_ids: self.bot_ids.clone(),
        }
    }

    pub fn classify(&self, sender_id: &str) -> Sender {
        if self.viewer_id.as_deref() == Some(sender_id) {
            Sender::Viewer
        } else if self.bot_ids.contains(sender_id) {
            Sender::Bot
        } else {
            Sender::Other
        }
    }

    /// Map a stored record onto the engine's message shape.
    pub fn to_message(&self, record: &StoredMessage) -> Message {
        Message {
            id: record.id.clone(),
            sender: self.classify(&record.sender_id),
            content: serde_json::Value::String(record.content.clone()),
            timestamp: record.timestamp,
            reply_to_id: record.reply_to_id.clone().filter(|r| !r.is_empty()),
        }
    }
}

fn most_frequent_sender(records: &[StoredMessage]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, record) in records.iter().enumerate() {
        counts.entry(record.sender_id.as_str()).or_insert((0, order)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
        .map(|(id, _)| id.to_string())
}

/// Replay `records` (oldest first) into a fresh navigator.
pub fn build_navigator(
    records: &[StoredMessage],
    perspective: &Perspective,
    strategy: Box<dyn NavigationStrategy>,
) -> Result<TreeNavigator> {
    let perspective = perspective.resolve(records);
    let mut nav = TreeNavigator::with_strategy(strategy);
    for record in records {
        nav.process_message(perspective.to_message(record))?;
    }
    debug!(
        viewer = ?perspective.viewer_id,
        messages = records.len(),
        layers = nav.store().layer_count(),
        "Tree rebuilt"
    );
    Ok(nav)
}
