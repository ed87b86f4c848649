use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, CallbackQueryId, InlineKeyboardMarkup, UpdateKind, User};
use teloxide::utils::command::BotCommands;

use crate::bot::{CallbackAnswer, Command};
use crate::platform::{BotControl, Incoming, Messenger};

/// Build a bot whose HTTP client gives up after `request_timeout`
pub fn build_bot(token: &str, request_timeout: Duration) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(request_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    Ok(Bot::with_client(token, client))
}

/// Username if set, numeric id otherwise
fn display_user(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.id.0.to_string())
}

/// Convert a raw update into something the handlers act on.
///
/// Only the first word of a message is parsed as a command, so `/play now`
/// is `/play`. Commands addressed to another bot (`/play@OtherBot`) and
/// every other update kind yield `None`.
pub fn to_incoming(update: &Update, bot_username: &str) -> Option<Incoming> {
    match &update.kind {
        UpdateKind::Message(msg) => {
            let head = msg.text()?.split_whitespace().next()?;
            let command = Command::parse(head, bot_username).ok()?;
            let user = msg
                .from
                .as_ref()
                .map(display_user)
                .unwrap_or_else(|| "unknown".to_string());
            Some(Incoming::Command {
                chat_id: msg.chat.id,
                command,
                user,
            })
        }
        UpdateKind::CallbackQuery(query) => Some(Incoming::Callback {
            query_id: query.id.clone(),
            game_short_name: query.game_short_name.clone(),
            user: display_user(&query.from),
        }),
        _ => None,
    }
}

#[async_trait]
impl Messenger for Bot {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send_message(chat_id, text)
            .await
            .context("sendMessage failed")?;
        Ok(())
    }

    async fn send_game_invite(
        &self,
        chat_id: ChatId,
        game_short_name: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        self.send_game(chat_id, game_short_name)
            .reply_markup(keyboard)
            .await
            .context("sendGame failed")?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: &CallbackQueryId,
        answer: &CallbackAnswer,
    ) -> Result<()> {
        let request = self.answer_callback_query(query_id.clone());
        match answer {
            CallbackAnswer::Url(url) => request.url(url.clone()).await,
            CallbackAnswer::Text(text) => request.text(*text).await,
        }
        .context("answerCallbackQuery failed")?;
        Ok(())
    }
}

#[async_trait]
impl BotControl for Bot {
    async fn bot_username(&self) -> Result<String> {
        let me = self.get_me().await.context("getMe failed")?;
        Ok(me.user.username.clone().unwrap_or_default())
    }

    async fn register_commands(&self) -> Result<()> {
        self.set_my_commands(Command::bot_commands())
            .await
            .context("setMyCommands failed")?;
        Ok(())
    }

    async fn clear_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        self.delete_webhook()
            .drop_pending_updates(drop_pending_updates)
            .await
            .context("deleteWebhook failed")?;
        Ok(())
    }

    async fn register_webhook(&self, url: &Url) -> Result<()> {
        self.set_webhook(url.clone())
            .await
            .context("setWebhook failed")?;
        Ok(())
    }

    async fn fetch_updates(&self, offset: i32, limit: u8, timeout_secs: u32) -> Result<Vec<Update>> {
        self.get_updates()
            .offset(offset)
            .limit(limit)
            .timeout(timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
            .await
            .context("getUpdates failed")
    }
}
