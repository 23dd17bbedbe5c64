//! Telegram long-poller.
//!
//! Pulls updates with `getUpdates`, hands messages to the [`TelegramAdapter`]
//! and checkpoints the update offset in the store so restarts resume where
//! they left off. Inserts are idempotent, so replays after a crash are safe.

use std::sync::Arc;
use std::time::Duration;

use portal_config::TelegramConfig;
use portal_core::error::ChannelError;
use portal_core::storage::MessageStore;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::telegram::{TelegramAdapter, TgMessage, TgUser};

/// Key under which the next update offset is persisted.
pub const OFFSET_KEY: &str = "offset";

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
}

/// Poller settings.
#[derive(Clone)]
pub struct PollerConfig {
    pub bot_token: String,
    /// Only ingest messages from this chat; all chats when unset
    pub chat_id: Option<String>,
    pub self_user_id: Option<String>,
    pub poll_timeout: Duration,
    pub retry_delay: Duration,
}

impl std::fmt::Debug for PollerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerConfig")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("self_user_id", &self.self_user_id)
            .field("poll_timeout", &self.poll_timeout)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl PollerConfig {
    pub fn from_config(config: &TelegramConfig) -> Result<Self, ChannelError> {
        let bot_token = config
            .bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ChannelError::NotConfigured(
                    "telegram.bot_token (or TELEGRAM_BOT_TOKEN) is required".into(),
                )
            })?;
        Ok(Self {
            bot_token,
            chat_id: config.chat_id.clone(),
            self_user_id: config.self_user_id.clone(),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }
}

pub struct TelegramPoller {
    config: PollerConfig,
    api_base: String,
    client: reqwest::Client,
    adapter: TelegramAdapter,
    store: Arc<dyn MessageStore>,
    offset: i64,
}

impl TelegramPoller {
    pub fn new(config: PollerConfig, store: Arc<dyn MessageStore>) -> Result<Self, ChannelError> {
        // The HTTP timeout must outlast the long-poll window.
        let client = reqwest::Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| ChannelError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            adapter: TelegramAdapter::new(store.clone(), config.self_user_id.clone()),
            config,
            api_base: DEFAULT_API_BASE.to_string(),
            client,
            store,
            offset: 0,
        })
    }

    /// Point the poller at a different Bot API host.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Load the persisted offset. Unparseable values restart from zero.
    pub async fn load_offset(&mut self) -> Result<i64, ChannelError> {
        self.offset = self
            .store
            .get_state(OFFSET_KEY)
            .await?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        Ok(self.offset)
    }

    async fn api_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChannelError> {
        let url = format!("{}/bot{}/{method}", self.api_base, self.config.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            // reqwest errors include the URL, which carries the token.
            .map_err(|e| ChannelError::Network(format!("{method}: {}", e.without_url())))?;

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidPayload(format!("{method}: {}", e.without_url())))?;

        if !body.ok {
            return Err(ChannelError::Api(
                body.description.unwrap_or_else(|| format!("{method} failed")),
            ));
        }
        body.result
            .ok_or_else(|| ChannelError::InvalidPayload(format!("{method}: missing result")))
    }

    /// Identify the bot behind the token.
    pub async fn get_me(&self) -> Result<TgUser, ChannelError> {
        self.api_call("getMe", json!({})).await
    }

    /// Fetch one batch of updates, ingest them and persist the new offset.
    /// Returns the number of messages ingested.
    pub async fn poll_once(&mut self) -> Result<usize, ChannelError> {
        let updates: Vec<Update> = self
            .api_call(
                "getUpdates",
                json!({
                    "offset": self.offset,
                    "timeout": self.config.poll_timeout.as_secs(),
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        if updates.is_empty() {
            return Ok(0);
        }

        let mut ingested = 0;
        for update in &updates {
            if let Some(msg) = &update.message {
                if self.accepts(msg) && self.adapter.ingest(msg, None).await?.is_some() {
                    ingested += 1;
                }
            }
            self.offset = self.offset.max(update.update_id + 1);
        }

        self.store
            .set_state(OFFSET_KEY, &self.offset.to_string())
            .await?;
        if ingested > 0 {
            info!(ingested, offset = self.offset, "Ingested Telegram messages");
        } else {
            debug!(offset = self.offset, "No matching messages in update batch");
        }
        Ok(ingested)
    }

    fn accepts(&self, msg: &TgMessage) -> bool {
        match &self.config.chat_id {
            Some(filter) => msg.chat.as_ref().is_some_and(|c| c.id.to_string() == *filter),
            None => true,
        }
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), ChannelError> {
        self.load_offset().await?;
        info!(
            chat = self.config.chat_id.as_deref().unwrap_or("all"),
            offset = self.offset,
            "Telegram poller starting"
        );

        match self.get_me().await {
            Ok(me) => info!(
                "Polling as @{} (id: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            ),
            Err(e) => warn!("Failed to verify bot identity: {e}"),
        }

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                result = self.poll_once() => {
                    if let Err(e) = result {
                        error!("Telegram poll failed: {e}");
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.retry_delay) => {}
                            changed = shutdown.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(offset = self.offset, "Telegram poller stopped");
        Ok(())
    }
}
