//! `portal status` — Show configuration summary.

use portal_config::AppConfig;

use super::CmdResult;

pub async fn run(config: AppConfig) -> CmdResult {
    println!("🌳 Knowledge Portal Status");
    println!("==========================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Storage:      {}", config.storage.backend);
    if config.storage.backend == "sqlite" {
        println!("  Database:     {}", config.storage.resolved_path().display());
    }
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Strategy:     {}", config.navigation.strategy);
    println!(
        "  Viewer:       {}",
        config
            .perspective
            .viewer_user_id
            .as_deref()
            .unwrap_or("(most active sender)")
    );
    println!(
        "  Bots:         {}",
        if config.perspective.bot_user_ids.is_empty() {
            "(none)".to_string()
        } else {
            config.perspective.bot_user_ids.join(", ")
        }
    );
    println!(
        "  Telegram:     {}",
        if config.telegram.bot_token.is_some() { "configured" } else { "not configured" }
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file; using defaults and environment");
    }

    println!("  📚 Sources:   {}", sources_summary(&config).await);

    Ok(())
}

/// Describe the stored sources without creating a database that does not
/// exist yet. Open failures are reported, not hidden.
pub async fn sources_summary(config: &AppConfig) -> String {
    if config.storage.backend == "sqlite" && !config.storage.resolved_path().exists() {
        return "(no database yet; run `portal seed` or `portal poll`)".to_string();
    }
    let sources = match super::open_store(config).await {
        Ok(store) => store.sources().await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match sources {
        Ok(sources) if sources.is_empty() => "(empty)".to_string(),
        Ok(sources) => sources.join(", "),
        Err(e) => format!("❌ store unavailable: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::seed;

    fn config_at(dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.path = dir.path().join("portal.db").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn missing_database_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_at(&dir);
        assert!(sources_summary(&config).await.starts_with("(no database yet"));
        assert!(!dir.path().join("portal.db").exists());
    }

    #[tokio::test]
    async fn lists_seeded_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_at(&dir);
        seed::run(config.clone(), None).await.unwrap();
        assert_eq!(sources_summary(&config).await, "mock");
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let mut config = AppConfig::default();
        config.storage.backend = "postgres".into();
        let summary = sources_summary(&config).await;
        assert!(summary.contains("store unavailable"), "{summary}");
        assert!(summary.contains("postgres"));
    }
}
