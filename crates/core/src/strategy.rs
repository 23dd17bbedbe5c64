//! Navigation strategies — decide where each incoming message lands.
//!
//! A strategy inspects the incoming message and a read-only view of the
//! [`LayerStore`] and returns an [`Action`]. The navigator performs every
//! mutation, so swapping strategies never touches store or orchestration code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::message::Message;
use crate::store::LayerStore;

/// What the navigator should do with an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Append to the current layer
    Append,
    /// Open a new child of `from_layer_id` and move the cursor there
    Branch { from_layer_id: String },
    /// Move the cursor to an existing layer and append at its tail
    Jump { to_layer_id: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Append => ActionKind::Append,
            Action::Branch { .. } => ActionKind::Branch,
            Action::Jump { .. } => ActionKind::Jump,
        }
    }
}

/// The parameterless kind of an [`Action`], reported back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Append,
    Branch,
    Jump,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Append => "append",
            ActionKind::Branch => "branch",
            ActionKind::Jump => "jump",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(ActionKind::Append),
            "branch" => Ok(ActionKind::Branch),
            "jump" => Ok(ActionKind::Jump),
            other => Err(Error::UnrecognizedAction(other.to_string())),
        }
    }
}

/// Conversation-shaping policy.
///
/// Implementations must be deterministic for a given store state and message;
/// they may read the store but cannot mutate it.
pub trait NavigationStrategy: Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &str;

    fn decide(&self, store: &LayerStore, message: &Message) -> Action;
}

/// The default rules:
///
/// 1. no reply → append to the current layer
/// 2. reply to an unknown message → append
/// 3. bot reply → jump to the layer of the message it answers
/// 4. reply to another sender → branch from the replied message's layer
/// 5. reply to your own message → jump back to that layer
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNavigationStrategy;

impl NavigationStrategy for DefaultNavigationStrategy {
    fn name(&self) -> &str {
        "default"
    }

    fn decide(&self, store: &LayerStore, message: &Message) -> Action {
        let Some(reply_to) = message.reply_to_id.as_deref().filter(|r| !r.is_empty()) else {
            return Action::Append;
        };
        let (Some(loc), Some(replied)) = (
            store.get_message_location(reply_to),
            store.get_message(reply_to),
        ) else {
            return Action::Append;
        };

        if message.sender.is_bot() || replied.sender == message.sender {
            Action::Jump {
                to_layer_id: loc.layer_id.clone(),
            }
        } else {
            Action::Branch {
                from_layer_id: loc.layer_id.clone(),
            }
        }
    }
}

/// Ignores replies entirely; the whole conversation stays in one layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatStrategy;

impl NavigationStrategy for FlatStrategy {
    fn name(&self) -> &str {
        "flat"
    }

    fn decide(&self, _store: &LayerStore, _message: &Message) -> Action {
        Action::Append
    }
}

/// Branches on every resolvable reply, regardless of who sent what.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadStrategy;

impl NavigationStrategy for ThreadStrategy {
    fn name(&self) -> &str {
        "thread"
    }

    fn decide(&self, store: &LayerStore, message: &Message) -> Action {
        message
            .reply_to_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| store.get_message_location(id))
            .map(|loc| Action::Branch {
                from_layer_id: loc.layer_id.clone(),
            })
            .unwrap_or(Action::Append)
    }
}

/// Built-in strategies selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Default,
    Flat,
    Thread,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn NavigationStrategy> {
        match self {
            StrategyKind::Default => Box::new(DefaultNavigationStrategy),
            StrategyKind::Flat => Box::new(FlatStrategy),
            StrategyKind::Thread => Box::new(ThreadStrategy),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(StrategyKind::Default),
            "flat" => Ok(StrategyKind::Flat),
            "thread" => Ok(StrategyKind::Thread),
            other => Err(Error::Config {
                message: format!("unknown navigation strategy '{other}' (expected default, flat or thread)"),
            }),
        }
    }
}
