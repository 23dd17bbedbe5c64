//! `portal poll` — Long-poll Telegram and ingest messages until Ctrl-C.

use portal_channels::{PollerConfig, TelegramPoller};
use portal_config::AppConfig;
use tokio::sync::watch;
use tracing::info;

use super::{CmdResult, open_store};

pub async fn run(config: AppConfig) -> CmdResult {
    let poller_config = PollerConfig::from_config(&config.telegram)?;
    let store = open_store(&config).await?;

    println!("🌳 Knowledge Portal Telegram Poller");
    println!(
        "   Chat filter: {}",
        poller_config.chat_id.as_deref().unwrap_or("all")
    );
    println!("   Store:       {}", store.name());

    let poller = TelegramPoller::new(poller_config, store)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping poller");
            let _ = shutdown_tx.send(true);
        }
    });

    poller.run(shutdown_rx).await?;
    Ok(())
}
