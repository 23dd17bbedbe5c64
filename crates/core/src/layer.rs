//! Layers — linear sub-conversations that make up the tree.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Label of the root layer.
pub const ROOT_LAYER_ID: &str = "A";

/// A child reference kept on the parent, pointing at the message in the
/// parent where the branch departs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRef {
    pub layer_id: String,
    pub branch_from_message_id: Option<String>,
}

/// A linear sequence of messages. `messages` is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub parent_layer_id: Option<String>,
    pub branch_from_message_id: Option<String>,
    pub messages: Vec<Message>,
    pub children: Vec<ChildRef>,
}

impl Layer {
    pub(crate) fn new(
        id: String,
        parent_layer_id: Option<String>,
        branch_from_message_id: Option<String>,
    ) -> Self {
        Self {
            id,
            parent_layer_id,
            branch_from_message_id,
            messages: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_layer_id.is_none()
    }
}

/// Where a message lives: its layer and zero-based offset within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLocation {
    pub layer_id: String,
    pub position: usize,
}

/// Label for the `n`th created layer: bijective base-26 over `A..=Z`.
///
/// `0 → A`, `25 → Z`, `26 → AA`, `701 → ZZ`, `702 → AAA`.
pub fn layer_label(n: usize) -> String {
    let mut label = Vec::new();
    let mut n = n + 1;
    while n > 0 {
        n -= 1;
        label.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    label.reverse();
    // Only ASCII uppercase bytes are ever pushed.
    String::from_utf8(label).unwrap_or_default()
}
