//! Versioned snapshots of a navigator's state.
//!
//! A [`Snapshot`] lists every layer in creation order together with the
//! cursor and label counter. The message index is never serialized; import
//! re-derives it from the layers so it cannot drift from their contents.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layer::{Layer, ROOT_LAYER_ID, layer_label};
use crate::navigator::TreeNavigator;
use crate::store::LayerStore;
use crate::strategy::{DefaultNavigationStrategy, NavigationStrategy};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    /// Layers in creation order, root first
    pub layers: Vec<Layer>,
    pub current_layer_id: String,
    pub layer_counter: usize,
}

impl TreeNavigator {
    /// Copy out the complete state.
    pub fn export_state(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            layers: self.store.layers().cloned().collect(),
            current_layer_id: self.current_layer_id.clone(),
            layer_counter: self.store.layer_count(),
        }
    }

    /// Rebuild a navigator with the default strategy from `snapshot`.
    pub fn from_state(snapshot: Snapshot) -> Result<Self> {
        Self::from_state_with_strategy(snapshot, Box::new(DefaultNavigationStrategy))
    }

    /// Rebuild a navigator from `snapshot`. The snapshot is fully validated
    /// before anything is constructed, so a failure leaves no partial state.
    pub fn from_state_with_strategy(
        snapshot: Snapshot,
        strategy: Box<dyn NavigationStrategy>,
    ) -> Result<Self> {
        snapshot.validate()?;
        let Snapshot {
            layers,
            current_layer_id,
            ..
        } = snapshot;
        Ok(TreeNavigator::from_parts(
            strategy,
            LayerStore::from_layers(layers),
            current_layer_id,
        ))
    }
}

impl Snapshot {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a snapshot document.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that the snapshot describes a tree the navigator could have built.
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(malformed(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        if self.layer_counter != self.layers.len() {
            return Err(malformed(format!(
                "layer counter {} does not match {} layers",
                self.layer_counter,
                self.layers.len()
            )));
        }

        let mut by_id: HashMap<&str, &Layer> = HashMap::new();
        for (n, layer) in self.layers.iter().enumerate() {
            let expected = layer_label(n);
            if layer.id != expected {
                return Err(malformed(format!(
                    "layer #{n} is labelled '{}', expected '{expected}'",
                    layer.id
                )));
            }
            by_id.insert(layer.id.as_str(), layer);
        }

        let root = by_id
            .get(ROOT_LAYER_ID)
            .ok_or_else(|| malformed("missing root layer".into()))?;
        if root.parent_layer_id.is_some() || root.branch_from_message_id.is_some() {
            return Err(malformed("root layer must not have a parent or branch point".into()));
        }

        for layer in self.layers.iter().skip(1) {
            let parent_id = layer
                .parent_layer_id
                .as_deref()
                .ok_or_else(|| malformed(format!("layer '{}' has no parent", layer.id)))?;
            let parent = by_id.get(parent_id).ok_or_else(|| {
                malformed(format!("layer '{}' names unknown parent '{parent_id}'", layer.id))
            })?;
            // Labels grow with creation, so a parent always precedes its child.
            if parent.id.len() > layer.id.len()
                || (parent.id.len() == layer.id.len() && parent.id >= layer.id)
            {
                return Err(malformed(format!(
                    "layer '{}' was created before its parent '{parent_id}'",
                    layer.id
                )));
            }
            let linked = parent.children.iter().any(|c| {
                c.layer_id == layer.id && c.branch_from_message_id == layer.branch_from_message_id
            });
            if !linked {
                return Err(malformed(format!(
                    "parent '{parent_id}' does not list child '{}'",
                    layer.id
                )));
            }
        }

        let mut seen_children = HashSet::new();
        for layer in &self.layers {
            for child in &layer.children {
                let listed = by_id.get(child.layer_id.as_str()).ok_or_else(|| {
                    malformed(format!("layer '{}' lists unknown child '{}'", layer.id, child.layer_id))
                })?;
                if listed.parent_layer_id.as_deref() != Some(layer.id.as_str()) {
                    return Err(malformed(format!(
                        "layer '{}' lists child '{}' whose parent differs",
                        layer.id, child.layer_id
                    )));
                }
                if !seen_children.insert(child.layer_id.as_str()) {
                    return Err(malformed(format!("child '{}' listed twice", child.layer_id)));
                }
            }
        }

        let mut message_ids = HashSet::new();
        for layer in &self.layers {
            for message in &layer.messages {
                if !message_ids.insert(message.id.as_str()) {
                    return Err(malformed(format!("duplicate message id '{}'", message.id)));
                }
            }
        }

        if !by_id.contains_key(self.current_layer_id.as_str()) {
            return Err(malformed(format!(
                "current layer '{}' does not exist",
                self.current_layer_id
            )));
        }

        Ok(())
    }
}

fn malformed(reason: String) -> Error {
    Error::MalformedSnapshot(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Sender};

    fn populated() -> TreeNavigator {
        let mut nav = TreeNavigator::new();
        nav.process_all(vec![
            Message::new("1", Sender::Viewer, "a1", 1),
            Message::new("2", Sender::Other, "a2", 2),
            Message::new("3", Sender::Viewer, "b1", 3).replying_to("2"),
            Message::new("4", Sender::Other, "b2", 4).replying_to("3"),
            Message::new("5", Sender::Viewer, "a3", 5).replying_to("1"),
            Message::new("6", Sender::Viewer, "d1", 6).replying_to("2"),
        ])
        .unwrap();
        nav
    }

    #[test]
    fn export_import_round_trip() {
        let nav = populated();
        let restored = TreeNavigator::from_state(nav.export_state()).unwrap();

        assert_eq!(restored.render_tree(), nav.render_tree());
        assert_eq!(restored.get_current_layer_id(), nav.get_current_layer_id());
        for id in ["1", "2", "3", "4", "5", "6"] {
            assert_eq!(
                restored.get_message_location(id),
                nav.get_message_location(id),
                "location of {id}"
            );
        }
    }

    #[test]
    fn round_trip_through_json() {
        let nav = populated();
        let json = serde_json::to_string(&nav.export_state()).unwrap();
        assert!(json.contains("\"currentLayerId\""));
        let snapshot: Snapshot = serde_json::from_str(&json).unwrap();
        let restored = TreeNavigator::from_state(snapshot).unwrap();
        assert_eq!(restored.export_state(), nav.export_state());
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = Snapshot::from_json("{\"version\": 1").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));

        let json = populated().export_state().to_json_pretty().unwrap();
        assert_eq!(Snapshot::from_json(&json).unwrap().current_layer_id, "D");
    }

    #[test]
    fn restored_navigator_keeps_processing() {
        let nav = populated();
        let mut restored = TreeNavigator::from_state(nav.export_state()).unwrap();
        let placed = restored
            .process_message(Message::new("7", Sender::Viewer, "x", 7).replying_to("4"))
            .unwrap();
        // Label counter continues where the original stopped.
        assert_eq!(placed.layer_id, layer_label(nav.store().layer_count()));
    }

    #[test]
    fn basic_snapshot_contents() {
        let mut nav = TreeNavigator::new();
        nav.process_all(vec![
            Message::new("1", Sender::Viewer, "a1", 1),
            Message::new("2", Sender::Other, "a2", 2),
            Message::new("3", Sender::Viewer, "b1", 3).replying_to("2"),
        ])
        .unwrap();
        let restored = TreeNavigator::from_state(nav.export_state()).unwrap();
        assert_eq!(restored.get_current_layer_id(), "B");
        assert_eq!(restored.get_layer("A").unwrap().messages.len(), 2);
        assert_eq!(restored.get_layer("B").unwrap().messages.len(), 1);
    }

    fn expect_malformed(snapshot: Snapshot) {
        let err = TreeNavigator::from_state(snapshot).unwrap_err();
        assert!(matches!(err, Error::MalformedSnapshot(_)), "got {err:?}");
    }

    #[test]
    fn rejects_unknown_version() {
        let mut snapshot = populated().export_state();
        snapshot.version = 99;
        expect_malformed(snapshot);
    }

    #[test]
    fn rejects_missing_root() {
        let mut snapshot = populated().export_state();
        snapshot.layers.remove(0);
        snapshot.layer_counter -= 1;
        expect_malformed(snapshot);
    }

    #[test]
    fn rejects_counter_mismatch() {
        let mut snapshot = populated().export_state();
        snapshot.layer_counter += 1;
        expect_malformed(snapshot);
    }

    #[test]
    fn rejects_orphaned_child() {
        let mut snapshot = populated().export_state();
        snapshot.layers[0].children.clear();
        expect_malformed(snapshot);
    }

    #[test]
    fn rejects_inconsistent_parent() {
        let mut snapshot = populated().export_state();
        snapshot.layers[1].parent_layer_id = Some("C".into());
        expect_malformed(snapshot);
    }

    #[test]
    fn rejects_duplicate_messages() {
        let mut snapshot = populated().export_state();
        let dup = snapshot.layers[0].messages[0].clone();
        snapshot.layers[1].messages.push(dup);
        expect_malformed(snapshot);
    }

    #[test]
    fn rejects_unknown_cursor() {
        let mut snapshot = populated().export_state();
        snapshot.current_layer_id = "ZZ".into();
        expect_malformed(snapshot);
    }

    #[test]
    fn rejects_json_missing_layer_fields() {
        let json = r#"{"version":1,"layers":[{"id":"A"}],"currentLayerId":"A","layerCounter":1}"#;
        assert!(serde_json::from_str::<Snapshot>(json).is_err());
    }
}
