//! `portal state` — Inspect or reset ingestion checkpoints.

use portal_config::AppConfig;

use super::{CmdResult, open_store};

pub async fn get(config: AppConfig, key: &str) -> CmdResult {
    let store = open_store(&config).await?;
    match store.get_state(key).await? {
        Some(value) => println!("{key} = {value}"),
        None => println!("{key} is not set"),
    }
    Ok(())
}

pub async fn set(config: AppConfig, key: &str, value: &str) -> CmdResult {
    let store = open_store(&config).await?;
    let previous = store.get_state(key).await?;
    store.set_state(key, value).await?;
    println!("✅ {key}: {} → {value}", previous.as_deref().unwrap_or("(none)"));
    Ok(())
}
