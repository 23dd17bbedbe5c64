//! `portal serve` — Start the HTTP API server.

use portal_config::AppConfig;

use super::CmdResult;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> CmdResult {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    config.validate()?;

    println!("🌳 Knowledge Portal Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Storage:   {} ({})", config.storage.backend, config.storage.path);
    println!("   Strategy:  {}", config.navigation.strategy);

    portal_gateway::start(config).await?;

    Ok(())
}
