//! `portal export` — Write a channel's tree snapshot as JSON.

use std::path::PathBuf;

use portal_config::AppConfig;

use super::{CmdResult, load_channel, navigator_for};

pub async fn run(config: AppConfig, source: &str, channel: &str, output: Option<PathBuf>) -> CmdResult {
    let records = load_channel(&config, source, channel).await?;
    let nav = navigator_for(&config, &records)?;
    let json = nav.export_state().to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!(
                "✅ Exported {} layers of {source}/{channel} to {}",
                nav.store().layer_count(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::seed;
    use portal_core::{Snapshot, TreeNavigator};

    #[tokio::test]
    async fn export_writes_importable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.path = dir.path().join("portal.db").to_string_lossy().into_owned();
        seed::run(config.clone(), None).await.unwrap();

        let out = dir.path().join("snapshot.json");
        run(config, seed::SOURCE, seed::CHANNEL, Some(out.clone()))
            .await
            .unwrap();

        let snapshot = Snapshot::from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let restored = TreeNavigator::from_state(snapshot).unwrap();
        assert_eq!(restored.get_current_layer_id(), "D");
        assert_eq!(restored.store().layer_count(), 4);
    }

    #[tokio::test]
    async fn export_of_empty_channel_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.path = dir.path().join("portal.db").to_string_lossy().into_owned();
        assert!(run(config, "mock", "nowhere", None).await.is_err());
    }
}
