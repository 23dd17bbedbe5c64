//! Tree navigator — places messages into layers one at a time.
//!
//! The navigator owns a [`LayerStore`] and a cursor. For every message it asks
//! its [`NavigationStrategy`] for an [`Action`], applies it, and appends the
//! message. Processing is single pass: a reply that arrives before the message
//! it references is treated as a reply to an unknown message.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layer::{Layer, MessageLocation, ROOT_LAYER_ID};
use crate::message::Message;
use crate::store::{LayerStore, TreeNode};
use crate::strategy::{Action, ActionKind, DefaultNavigationStrategy, NavigationStrategy};

/// Where a processed message landed and which action placed it there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub layer_id: String,
    pub action: ActionKind,
    pub position: usize,
}

pub struct TreeNavigator {
    strategy: Box<dyn NavigationStrategy>,
    pub(crate) store: LayerStore,
    pub(crate) current_layer_id: String,
}

impl TreeNavigator {
    /// A navigator using [`DefaultNavigationStrategy`].
    pub fn new() -> Self {
        Self::with_strategy(Box::new(DefaultNavigationStrategy))
    }

    /// A navigator with a caller-supplied strategy. The root layer `A` is
    /// created here and becomes the current layer.
    pub fn with_strategy(strategy: Box<dyn NavigationStrategy>) -> Self {
        Self {
            strategy,
            store: LayerStore::with_root(),
            current_layer_id: ROOT_LAYER_ID.to_string(),
        }
    }

    pub(crate) fn from_parts(
        strategy: Box<dyn NavigationStrategy>,
        store: LayerStore,
        current_layer_id: String,
    ) -> Self {
        Self {
            strategy,
            store,
            current_layer_id,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Place `message` and report where it went.
    ///
    /// On error (a message id that was already placed, or a strategy naming a
    /// layer that does not exist) the store and cursor are left untouched.
    pub fn process_message(&mut self, mut message: Message) -> Result<Placement> {
        if self.store.get_message_location(&message.id).is_some() {
            return Err(Error::DuplicateMessage(message.id));
        }
        message.sender = message.sender.canonical();

        let action = self.strategy.decide(&self.store, &message);
        let kind = action.kind();

        let target = match action {
            Action::Append => self.current_layer_id.clone(),
            Action::Branch { from_layer_id } => self
                .store
                .create_layer(&from_layer_id, message.reply_to_id.as_deref())?
                .id
                .clone(),
            Action::Jump { to_layer_id } => {
                if !self.store.contains_layer(&to_layer_id) {
                    return Err(Error::UnknownLayer(to_layer_id));
                }
                to_layer_id
            }
        };

        let position = self.store.append_message(&target, message)?;
        self.current_layer_id.clone_from(&target);

        Ok(Placement {
            layer_id: target,
            action: kind,
            position,
        })
    }

    /// Process `messages` in order, stopping at the first error.
    pub fn process_all<I>(&mut self, messages: I) -> Result<Vec<Placement>>
    where
        I: IntoIterator<Item = Message>,
    {
        messages
            .into_iter()
            .map(|m| self.process_message(m))
            .collect()
    }

    pub fn get_layer(&self, id: &str) -> Option<&Layer> {
        self.store.get_layer(id)
    }

    pub fn get_current_layer_id(&self) -> &str {
        &self.current_layer_id
    }

    pub fn get_message_location(&self, message_id: &str) -> Option<&MessageLocation> {
        self.store.get_message_location(message_id)
    }

    pub fn render_tree(&self) -> TreeNode {
        // The root is created with the navigator and never removed.
        self.store.render_tree().unwrap_or_else(|| TreeNode {
            branch_from_message_id: None,
            id: ROOT_LAYER_ID.to_string(),
            message_count: 0,
            children: Vec::new(),
        })
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &LayerStore {
        &self.store
    }
}

impl Default for TreeNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TreeNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNavigator")
            .field("strategy", &self.strategy.name())
            .field("current_layer_id", &self.current_layer_id)
            .field("layers", &self.store.layer_count())
            .field("messages", &self.store.message_count())
            .finish()
    }
}
