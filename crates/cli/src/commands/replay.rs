//! `portal replay` — Show where each message of a channel lands.

use chrono::DateTime;
use portal_config::AppConfig;
use portal_core::{ActionKind, Placement, StoredMessage};

use super::{CmdResult, load_channel};

pub async fn run(config: AppConfig, source: &str, channel: &str, only: Option<&str>) -> CmdResult {
    // Parse the filter before touching the store so typos fail fast.
    let only: Option<ActionKind> = only.map(str::parse).transpose()?;
    let records = load_channel(&config, source, channel).await?;

    let steps = replay(&config, &records)?;
    for (record, placement) in &steps {
        if only.is_some_and(|kind| kind != placement.action) {
            continue;
        }
        println!("{}", describe(record, placement));
    }
    Ok(())
}

/// Rebuild the channel one message at a time, keeping every placement.
pub fn replay<'a>(
    config: &AppConfig,
    records: &'a [StoredMessage],
) -> Result<Vec<(&'a StoredMessage, Placement)>, Box<dyn std::error::Error>> {
    let perspective = config.perspective.to_perspective().resolve(records);
    let mut nav = portal_core::TreeNavigator::with_strategy(config.navigation.strategy_kind()?.build());

    let mut steps = Vec::with_capacity(records.len());
    for record in records {
        let placement = nav.process_message(perspective.to_message(record))?;
        steps.push((record, placement));
    }
    Ok(steps)
}

pub fn describe(record: &StoredMessage, placement: &Placement) -> String {
    let when = DateTime::from_timestamp_millis(record.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| record.timestamp.to_string());
    let who = record.sender_name.as_deref().unwrap_or(&record.sender_id);
    let mut preview: String = record.content.chars().take(48).collect();
    if record.content.chars().count() > 48 {
        preview.push('…');
    }
    format!(
        "{when}  {:<6} {}[{}]  {}  {who}: {preview}",
        placement.action.as_str(), placement.layer_id, placement.position, record.id
    )
}
