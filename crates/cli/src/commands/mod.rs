pub mod export;
pub mod poll;
pub mod replay;
pub mod seed;
pub mod serve;
pub mod state;
pub mod status;
pub mod tree;

use std::sync::Arc;

use portal_config::AppConfig;
use portal_core::{MessageStore, StoredMessage, TreeNavigator, build_navigator};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the configured message store.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn MessageStore>, Box<dyn std::error::Error>> {
    Ok(portal_store::open_store(&config.storage).await?)
}

/// Rebuild the tree for a channel with the configured perspective and strategy.
pub fn navigator_for(
    config: &AppConfig,
    records: &[StoredMessage],
) -> Result<TreeNavigator, Box<dyn std::error::Error>> {
    let strategy = config.navigation.strategy_kind()?;
    Ok(build_navigator(
        records,
        &config.perspective.to_perspective(),
        strategy.build(),
    )?)
}

/// Load a channel's records, failing with a hint when there are none.
pub async fn load_channel(
    config: &AppConfig,
    source: &str,
    channel: &str,
) -> Result<Vec<StoredMessage>, Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let records = store.messages(source, channel).await?;
    if records.is_empty() {
        return Err(format!(
            "No messages for {source}/{channel}. Known channels: {}",
            store.channels(source).await?.join(", ")
        )
        .into());
    }
    Ok(records)
}
