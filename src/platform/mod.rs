pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use teloxide::types::{CallbackQueryId, ChatId, InlineKeyboardMarkup, Update};

use crate::bot::{CallbackAnswer, Command};

/// An update the bot knows how to act on, stripped of everything else
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Command {
        chat_id: ChatId,
        command: Command,
        /// Username if the sender has one, otherwise the numeric user id
        user: String,
    },
    Callback {
        query_id: CallbackQueryId,
        game_short_name: Option<String>,
        user: String,
    },
}

/// Outbound replies used by the handlers
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Send the `game_short_name` game with `keyboard` as its inline markup.
    async fn send_game_invite(
        &self,
        chat_id: ChatId,
        game_short_name: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()>;

    async fn answer_callback(
        &self,
        query_id: &CallbackQueryId,
        answer: &CallbackAnswer,
    ) -> Result<()>;
}

/// Delivery plumbing used by the webhook and polling transports
#[async_trait]
pub trait BotControl: Send + Sync {
    /// The bot's own @username, used to accept `/cmd@username`.
    async fn bot_username(&self) -> Result<String>;

    async fn register_commands(&self) -> Result<()>;

    async fn clear_webhook(&self, drop_pending_updates: bool) -> Result<()>;

    async fn register_webhook(&self, url: &Url) -> Result<()>;

    /// One getUpdates round-trip, limited to messages and callback queries.
    async fn fetch_updates(&self, offset: i32, limit: u8, timeout_secs: u32) -> Result<Vec<Update>>;
}
