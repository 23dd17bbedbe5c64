//! # Portal Core
//!
//! Domain types, traits, and error definitions for the Knowledge Portal.
//! The layer-tree engine lives here: messages linked by replies are placed
//! into a tree of layers, each a linear run of messages branching from a
//! message in its parent.
//!
//! Storage and ingestion are defined as traits and plain records so that
//! `portal-store`, `portal-channels` and `portal-gateway` can depend inward
//! on this crate without pulling in a runtime.

pub mod error;
pub mod layer;
pub mod message;
pub mod navigator;
pub mod perspective;
pub mod record;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod strategy;

// Re-export key types at crate root for ergonomics
pub use error::{ChannelError, Error, Result, StorageError};
pub use layer::{ChildRef, Layer, MessageLocation, ROOT_LAYER_ID, layer_label};
pub use message::{Message, Sender};
pub use navigator::{Placement, TreeNavigator};
pub use perspective::{Perspective, build_navigator};
pub use record::{IngestRequest, StoredMessage};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};
pub use storage::MessageStore;
pub use store::{LayerStore, TreeNode};
pub use strategy::{
    Action, ActionKind, DefaultNavigationStrategy, FlatStrategy, NavigationStrategy,
    StrategyKind, ThreadStrategy,
};
