//! Message log implementations for the Knowledge Portal.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::sync::Arc;

use portal_config::StorageConfig;
use portal_core::error::StorageError;
use portal_core::storage::MessageStore;
use tracing::info;

/// Open the backend named by `config.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn MessageStore>, StorageError> {
    match config.backend.as_str() {
        "memory" => {
            info!("Using in-memory message store; data is lost on exit");
            Ok(Arc::new(InMemoryStore::new()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.resolved_path();
            let store = SqliteStore::new(&path.to_string_lossy()).await?;
            Ok(Arc::new(store))
        }
        other => Err(StorageError::Storage(format!(
            "storage backend '{other}' is not available in this build"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_memory_backend() {
        let config = StorageConfig {
            backend: "memory".into(),
            ..StorageConfig::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn opens_sqlite_backend_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: "sqlite".into(),
            path: dir.path().join("portal.db").to_string_lossy().into_owned(),
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(dir.path().join("portal.db").exists());
    }

    #[tokio::test]
    async fn unknown_backend_is_an_error() {
        let config = StorageConfig {
            backend: "postgres".into(),
            ..StorageConfig::default()
        };
        assert!(open_store(&config).await.is_err());
    }
}
