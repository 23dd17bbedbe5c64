//! Configuration loading, validation, and management for the Knowledge Portal.
//!
//! Loads configuration from `~/.portal/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use portal_core::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Telegram caps long-poll timeouts at 50 seconds.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// The root configuration structure.
///
/// Maps directly to `~/.portal/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Message log backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Whose point of view trees are built from
    #[serde(default)]
    pub perspective: PerspectiveConfig,

    /// Branching rules
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Telegram Bot API ingestion
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// SQLite database file; `~/` is expanded against the home directory
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}
fn default_db_path() -> String {
    "~/.portal/portal.db".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_db_path(),
        }
    }
}

impl StorageConfig {
    /// The database path with a leading `~/` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        match self.path.strip_prefix("~/") {
            Some(rest) => dirs_home().join(rest),
            None => PathBuf::from(&self.path),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerspectiveConfig {
    /// Sender ID treated as the viewer; the most active sender when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_user_id: Option<String>,

    /// Sender IDs classified as bots
    #[serde(default)]
    pub bot_user_ids: Vec<String>,
}

impl PerspectiveConfig {
    pub fn to_perspective(&self) -> portal_core::Perspective {
        portal_core::Perspective::new(self.viewer_user_id.clone(), self.bot_user_ids.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// "default", "flat" or "thread"
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

fn default_strategy() -> String {
    "default".into()
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
        }
    }
}

impl NavigationConfig {
    pub fn strategy_kind(&self) -> Result<StrategyKind, ConfigError> {
        self.strategy
            .parse()
            .map_err(|e: portal_core::Error| ConfigError::ValidationError(e.to_string()))
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Only ingest updates from this chat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    /// The account whose messages are recorded with role "self"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_user_id: Option<String>,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_poll_timeout() -> u64 {
    30
}
fn default_retry_delay() -> u64 {
    5000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            self_user_id: None,
            poll_timeout_secs: default_poll_timeout(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("chat_id", &self.chat_id)
            .field("self_user_id", &self.self_user_id)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

impl AppConfig {
    /// Load from `path` if given, else the default location, then apply
    /// environment overrides and validate.
    ///
    /// Recognized variables:
    /// - `DB_PATH`, `PORT`
    /// - `PORTAL_VIEWER_USER_ID`, `PORTAL_BOT_USER_IDS` (comma separated)
    /// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` (or `TG_CHAT_ID`),
    ///   `TELEGRAM_SELF_USER_ID`
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Self::config_dir().join("config.toml");
        let mut config = Self::read_file(path.unwrap_or(&default_path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides read through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var("DB_PATH") {
            self.storage.path = path;
        }
        if let Some(port) = var("PORT") {
            self.gateway.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(viewer) = var("PORTAL_VIEWER_USER_ID") {
            self.perspective.viewer_user_id = Some(viewer);
        }
        if let Some(bots) = var("PORTAL_BOT_USER_IDS") {
            self.perspective.bot_user_ids = bots
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat) = var("TELEGRAM_CHAT_ID").or_else(|| var("TG_CHAT_ID")) {
            self.telegram.chat_id = Some(chat);
        }
        if let Some(user) = var("TELEGRAM_SELF_USER_ID") {
            self.telegram.self_user_id = Some(user);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".portal")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError("gateway.port must be non-zero".into()));
        }

        if !matches!(self.storage.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown storage backend '{}' (expected sqlite or memory)",
                self.storage.backend
            )));
        }

        self.navigation.strategy_kind()?;

        if self.telegram.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "telegram.poll_timeout_secs must be at most {MAX_POLL_TIMEOUT_SECS}"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
