//! `portal tree` — Print a channel's layer tree.

use portal_config::AppConfig;
use portal_core::TreeNode;

use super::{CmdResult, load_channel, navigator_for};

pub async fn run(config: AppConfig, source: &str, channel: &str) -> CmdResult {
    let records = load_channel(&config, source, channel).await?;
    let nav = navigator_for(&config, &records)?;

    println!("🌳 {source}/{channel} ({} messages, {} layers)", records.len(), nav.store().layer_count());
    for line in render(&nav.render_tree(), nav.get_current_layer_id()) {
        println!("{line}");
    }
    Ok(())
}

/// One line per layer, children indented under their parent. The current
/// layer is marked with `*`.
pub fn render(tree: &TreeNode, current: &str) -> Vec<String> {
    let mut lines = Vec::new();
    push_node(tree, current, 0, &mut lines);
    lines
}

fn push_node(node: &TreeNode, current: &str, depth: usize, lines: &mut Vec<String>) {
    let marker = if node.id == current { " *" } else { "" };
    let origin = node
        .branch_from_message_id
        .as_deref()
        .map(|id| format!(" ← {id}"))
        .unwrap_or_default();
    let plural = if node.message_count == 1 { "" } else { "s" };
    lines.push(format!(
        "{}{}{origin} ({} message{plural}){marker}",
        "  ".repeat(depth),
        node.id,
        node.message_count
    ));
    for child in &node.children {
        push_node(child, current, depth + 1, lines);
    }
}
