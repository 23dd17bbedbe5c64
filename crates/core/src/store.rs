//! Layer store — owns every layer and the global message index.
//!
//! All mutation goes through [`LayerStore::create_layer`] and
//! [`LayerStore::append_message`]. Parents are fixed at creation, so the
//! parent/child links always form a tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layer::{ChildRef, Layer, MessageLocation, ROOT_LAYER_ID, layer_label};
use crate::message::Message;

/// Nested, display-oriented projection of the layer tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Message in the parent layer this layer branched from (absent on the root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_from_message_id: Option<String>,
    pub id: String,
    pub message_count: usize,
    pub children: Vec<TreeNode>,
}

/// Owned aggregate of layers, their creation order, and the message index.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    /// Layers in creation order; a layer's slot is its label number.
    layers: Vec<Layer>,
    by_id: HashMap<String, usize>,
    index: HashMap<String, MessageLocation>,
}

impl LayerStore {
    /// An empty store with no root. Use [`LayerStore::with_root`] for a usable one.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding only the root layer `A`.
    pub fn with_root() -> Self {
        let mut store = Self::new();
        store.push_layer(Layer::new(layer_label(0), None, None));
        store
    }

    /// Allocate the next label and register a child of `parent_layer_id`
    /// branching at `branch_from_message_id` (normally the replied-to message).
    ///
    /// The root is only ever created by [`LayerStore::with_root`], so every
    /// other layer has exactly one parent fixed here.
    pub fn create_layer(
        &mut self,
        parent_layer_id: &str,
        branch_from_message_id: Option<&str>,
    ) -> Result<&Layer> {
        let parent_slot = *self
            .by_id
            .get(parent_layer_id)
            .ok_or_else(|| Error::UnknownLayer(parent_layer_id.to_string()))?;
        let id = layer_label(self.layers.len());
        self.layers[parent_slot].children.push(ChildRef {
            layer_id: id.clone(),
            branch_from_message_id: branch_from_message_id.map(str::to_string),
        });
        debug!(layer = %id, parent = %parent_layer_id, from = ?branch_from_message_id, "Branch layer created");

        let slot = self.push_layer(Layer::new(
            id,
            Some(parent_layer_id.to_string()),
            branch_from_message_id.map(str::to_string),
        ));
        Ok(&self.layers[slot])
    }

    /// Push `message` to the tail of `layer_id`, returning its position.
    /// Message ids are unique across the whole store.
    pub fn append_message(&mut self, layer_id: &str, message: Message) -> Result<usize> {
        if self.index.contains_key(&message.id) {
            return Err(Error::DuplicateMessage(message.id));
        }
        let slot = *self
            .by_id
            .get(layer_id)
            .ok_or_else(|| Error::UnknownLayer(layer_id.to_string()))?;
        let layer = &mut self.layers[slot];
        let position = layer.messages.len();
        self.index.insert(
            message.id.clone(),
            MessageLocation {
                layer_id: layer.id.clone(),
                position,
            },
        );
        layer.messages.push(message);
        Ok(position)
    }

    pub fn get_layer(&self, id: &str) -> Option<&Layer> {
        self.by_id.get(id).map(|&slot| &self.layers[slot])
    }

    pub fn get_message_location(&self, message_id: &str) -> Option<&MessageLocation> {
        self.index.get(message_id)
    }

    /// Resolve a message through the index.
    pub fn get_message(&self, message_id: &str) -> Option<&Message> {
        let loc = self.index.get(message_id)?;
        self.get_layer(&loc.layer_id)?.messages.get(loc.position)
    }

    pub fn contains_layer(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Layers in creation order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn message_count(&self) -> usize {
        self.index.len()
    }

    /// Render the tree from the root. Children appear in branch creation order.
    pub fn render_tree(&self) -> Option<TreeNode> {
        self.get_layer(ROOT_LAYER_ID)
            .map(|root| self.subtree(root, None))
    }

    fn subtree(&self, layer: &Layer, branch_from: Option<&str>) -> TreeNode {
        TreeNode {
            branch_from_message_id: branch_from.map(str::to_string),
            id: layer.id.clone(),
            message_count: layer.messages.len(),
            children: layer
                .children
                .iter()
                .filter_map(|child| {
                    self.get_layer(&child.layer_id)
                        .map(|l| self.subtree(l, child.branch_from_message_id.as_deref()))
                })
                .collect(),
        }
    }

    /// Rebuild a store from layers given in creation order, re-deriving the
    /// index by scanning each layer's messages. Callers validate structure.
    pub(crate) fn from_layers(layers: Vec<Layer>) -> Self {
        let mut store = Self::new();
        for layer in layers {
            for (position, message) in layer.messages.iter().enumerate() {
                store.index.insert(
                    message.id.clone(),
                    MessageLocation {
                        layer_id: layer.id.clone(),
                        position,
                    },
                );
            }
            store.push_layer(layer);
        }
        store
    }

    fn push_layer(&mut self, layer: Layer) -> usize {
        let slot = self.layers.len();
        self.by_id.insert(layer.id.clone(), slot);
        self.layers.push(layer);
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;

    fn msg(id: &str, sender: Sender) -> Message {
        Message::new(id, sender, id, 0)
    }

    #[test]
    fn root_store_has_layer_a() {
        let store = LayerStore::with_root();
        let root = store.get_layer("A").unwrap();
        assert!(root.is_root());
        assert!(root.branch_from_message_id.is_none());
        assert_eq!(store.layer_count(), 1);
    }

    #[test]
    fn append_records_index_entry() {
        let mut store = LayerStore::with_root();
        assert_eq!(store.append_message("A", msg("1", Sender::Viewer)).unwrap(), 0);
        assert_eq!(store.append_message("A", msg("2", Sender::Other)).unwrap(), 1);

        let loc = store.get_message_location("2").unwrap();
        assert_eq!(loc.layer_id, "A");
        assert_eq!(loc.position, 1);
        assert_eq!(store.get_message("2").unwrap().sender, Sender::Other);
    }

    #[test]
    fn append_rejects_repeated_id() {
        let mut store = LayerStore::with_root();
        store.append_message("A", msg("1", Sender::Viewer)).unwrap();
        let err = store.append_message("A", msg("1", Sender::Other)).unwrap_err();
        assert!(matches!(err, Error::DuplicateMessage(id) if id == "1"));
        assert_eq!(store.get_layer("A").unwrap().messages.len(), 1);
        assert_eq!(store.get_message("1").unwrap().sender, Sender::Viewer);
    }

    #[test]
    fn append_to_unknown_layer_fails() {
        let mut store = LayerStore::with_root();
        let err = store.append_message("Q", msg("1", Sender::Viewer)).unwrap_err();
        assert!(matches!(err, Error::UnknownLayer(id) if id == "Q"));
        assert_eq!(store.message_count(), 0);
    }

    #[test]
    fn create_layer_links_parent_and_child() {
        let mut store = LayerStore::with_root();
        store.append_message("A", msg("1", Sender::Other)).unwrap();
        let child = store.create_layer("A", Some("1")).unwrap();
        assert_eq!(child.id, "B");
        assert_eq!(child.parent_layer_id.as_deref(), Some("A"));

        let root = store.get_layer("A").unwrap();
        assert_eq!(
            root.children,
            vec![ChildRef {
                layer_id: "B".into(),
                branch_from_message_id: Some("1".into())
            }]
        );
    }

    #[test]
    fn create_layer_under_unknown_parent_fails() {
        let mut store = LayerStore::with_root();
        assert!(matches!(
            store.create_layer("Z", Some("1")),
            Err(Error::UnknownLayer(_))
        ));
        assert_eq!(store.layer_count(), 1);
    }

    #[test]
    fn render_tree_nests_children_in_creation_order() {
        let mut store = LayerStore::with_root();
        store.append_message("A", msg("1", Sender::Other)).unwrap();
        store.append_message("A", msg("2", Sender::Other)).unwrap();
        store.create_layer("A", Some("1")).unwrap();
        store.create_layer("A", Some("2")).unwrap();
        store.create_layer("B", Some("3")).unwrap();

        let tree = store.render_tree().unwrap();
        assert_eq!(tree.id, "A");
        assert_eq!(tree.message_count, 2);
        assert!(tree.branch_from_message_id.is_none());
        let ids: Vec<_> = tree.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["B", "C"]);
        assert_eq!(tree.children[0].branch_from_message_id.as_deref(), Some("1"));
        assert_eq!(tree.children[0].children[0].id, "D");
    }

    #[test]
    fn empty_store_renders_nothing() {
        assert!(LayerStore::new().render_tree().is_none());
    }
}
