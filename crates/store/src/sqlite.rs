//! SQLite message log.
//!
//! A single database file with two tables:
//! - `messages` — one row per ingested message, keyed by its global ID
//! - `poller_state` — key/value checkpoints for ingestion (update offsets)

use async_trait::async_trait;
use chrono::Utc;
use portal_core::error::StorageError;
use portal_core::record::StoredMessage;
use portal_core::storage::MessageStore;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Path that selects an ephemeral database.
pub const IN_MEMORY_PATH: &str = ":memory:";

const UPSERT_SQL: &str = r#"
    INSERT INTO messages (
        id, source, channel, chat_id, topic_id, sender_id, sender_name, sender_role,
        reply_to_id, content, content_type, timestamp, raw_meta, ingested_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    ON CONFLICT(id) DO UPDATE SET
        channel = COALESCE(excluded.channel, messages.channel),
        raw_meta = COALESCE(excluded.raw_meta, messages.raw_meta),
        chat_id = COALESCE(messages.chat_id, excluded.chat_id),
        topic_id = COALESCE(messages.topic_id, excluded.topic_id)
"#;

/// A persistent SQLite message log.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let in_memory = path == IN_MEMORY_PATH;
        let base = if in_memory {
            SqliteConnectOptions::from_str(path)
                .map_err(|e| StorageError::Storage(format!("Invalid SQLite path: {e}")))?
        } else {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            SqliteConnectOptions::new().filename(path)
        };
        let options = base
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Each connection to ":memory:" would otherwise see its own database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite message store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id           TEXT PRIMARY KEY,
                source       TEXT NOT NULL,
                channel      TEXT NOT NULL,
                chat_id      TEXT,
                topic_id     TEXT,
                sender_id    TEXT NOT NULL,
                sender_name  TEXT,
                sender_role  TEXT NOT NULL DEFAULT 'user',
                reply_to_id  TEXT,
                content      TEXT NOT NULL,
                content_type TEXT NOT NULL DEFAULT 'text',
                timestamp    INTEGER NOT NULL,
                raw_meta     TEXT,
                ingested_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_scope ON messages(source, chat_id, topic_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("scope index: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp)")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(format!("timestamp index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poller_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("poller_state table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Build the upsert for `record`. Arguments are owned so the query can run
    /// against the pool or inside a transaction.
    fn upsert(record: StoredMessage) -> Query<'static, Sqlite, SqliteArguments<'static>> {
        let raw_meta = record.raw_meta.as_ref().map(|m| m.to_string());
        sqlx::query(UPSERT_SQL)
            .bind(record.id)
            .bind(record.source)
            .bind(record.channel)
            .bind(record.chat_id)
            .bind(record.topic_id)
            .bind(record.sender_id)
            .bind(record.sender_name)
            .bind(record.sender_role)
            .bind(record.reply_to_id)
            .bind(record.content)
            .bind(record.content_type)
            .bind(record.timestamp)
            .bind(raw_meta)
            .bind(Utc::now().to_rfc3339())
    }

    /// Parse a `StoredMessage` from a SQLite row.
    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, StorageError> {
        fn col<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, StorageError>
        where
            T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
        {
            row.try_get(name)
                .map_err(|e| StorageError::QueryFailed(format!("{name} column: {e}")))
        }

        let raw_meta: Option<String> = col(row, "raw_meta")?;
        Ok(StoredMessage {
            id: col(row, "id")?,
            source: col(row, "source")?,
            channel: col(row, "channel")?,
            chat_id: col(row, "chat_id")?,
            topic_id: col(row, "topic_id")?,
            sender_id: col(row, "sender_id")?,
            sender_name: col(row, "sender_name")?,
            sender_role: col(row, "sender_role")?,
            reply_to_id: col(row, "reply_to_id")?,
            content: col(row, "content")?,
            content_type: col(row, "content_type")?,
            timestamp: col(row, "timestamp")?,
            raw_meta: raw_meta.and_then(|s| serde_json::from_str(&s).ok()),
        })
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, record: StoredMessage) -> Result<(), StorageError> {
        let id = record.id.clone();
        Self::upsert(record)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("INSERT failed: {e}")))?;
        debug!("Stored message {id}");
        Ok(())
    }

    async fn insert_batch(&self, records: Vec<StoredMessage>) -> Result<usize, StorageError> {
        let count = records.len();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Storage(format!("BEGIN failed: {e}")))?;
        for record in records {
            Self::upsert(record)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Storage(format!("INSERT failed: {e}")))?;
        }
        tx.commit()
            .await
            .map_err(|e| StorageError::Storage(format!("COMMIT failed: {e}")))?;
        debug!("Stored batch of {count} messages");
        Ok(count)
    }

    async fn messages(&self, source: &str, channel: &str) -> Result<Vec<StoredMessage>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE source = ?1 AND (channel = ?2 OR topic_id = ?2 OR chat_id = ?2)
            ORDER BY timestamp ASC, rowid ASC
            "#,
        )
        .bind(source)
        .bind(channel)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<StoredMessage>, StorageError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("GET failed: {e}")))?;

        row.as_ref().map(Self::row_to_message).transpose()
    }

    async fn channels(&self, source: &str) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT COALESCE(topic_id, chat_id, channel) AS scope
            FROM messages
            WHERE source = ?1
            ORDER BY scope
            "#,
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("channels: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get("scope")
                    .map_err(|e| StorageError::QueryFailed(format!("scope column: {e}")))
            })
            .collect()
    }

    async fn sources(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT DISTINCT source FROM messages ORDER BY source")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("sources: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get("source")
                    .map_err(|e| StorageError::QueryFailed(format!("source column: {e}")))
            })
            .collect()
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM poller_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("get_state: {e}")))?;

        row.map(|r| {
            r.try_get("value")
                .map_err(|e| StorageError::QueryFailed(format!("value column: {e}")))
        })
        .transpose()
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO poller_state (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("set_state: {e}")))?;
        Ok(())
    }
}
