//! Ingestion channels for the Knowledge Portal.
//!
//! Each channel turns a chat platform's wire format into stored message
//! records. Channels never build trees; the gateway does that on demand.
//!
//! Available channels:
//! - **Telegram** — Bot API message adapter plus a `getUpdates` long-poller

pub mod poller;
pub mod telegram;

pub use poller::{OFFSET_KEY, PollerConfig, TelegramPoller, Update};
pub use telegram::{TelegramAdapter, TgChat, TgMessage, TgUser};
