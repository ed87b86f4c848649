use anyhow::{bail, Context, Result};
use reqwest::Url;
use teloxide::macros::BotCommands;
use teloxide::types::{
    CallbackGame, CallbackQueryId, ChatId, InlineKeyboardButton, InlineKeyboardMarkup,
};
use tracing::{error, info};

use crate::platform::{Incoming, Messenger};

pub const WELCOME_TEXT: &str = "Привет! Это мини-игра Шахматы. Нажми /play чтобы начать ♟️";
pub const UNKNOWN_GAME_TEXT: &str = "Неизвестная игра.";
pub const PLAY_BUTTON_TEXT: &str = "Играть в шахматы ♟️";

/// Commands the bot answers to
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "приветствие")]
    Start,
    #[command(description = "сыграть в шахматы")]
    Play,
}

/// The game this bot launches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub short_name: String,
    pub url: Url,
}

impl GameSettings {
    pub fn new(short_name: &str, url: &str) -> Result<Self> {
        let short_name = short_name.trim();
        if short_name.is_empty() {
            bail!("Game short name is empty");
        }
        let url = Url::parse(url.trim()).with_context(|| format!("Invalid game URL: {url}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Game URL must be http(s): {url}");
        }
        Ok(Self {
            short_name: short_name.to_string(),
            url,
        })
    }
}

/// One row, one button. A `callback_game` button must come first in a game message.
pub fn play_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback_game(
        PLAY_BUTTON_TEXT,
        CallbackGame {},
    )]])
}

/// How a callback query gets answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAnswer {
    /// Open the game front-end
    Url(Url),
    /// Short notice shown to the user
    Text(&'static str),
}

impl CallbackAnswer {
    pub fn for_game(game: &GameSettings, game_short_name: Option<&str>) -> Self {
        match game_short_name {
            Some(name) if name == game.short_name => CallbackAnswer::Url(game.url.clone()),
            _ => CallbackAnswer::Text(UNKNOWN_GAME_TEXT),
        }
    }
}

pub async fn handle_start<M>(messenger: &M, chat_id: ChatId, user: &str) -> Result<()>
where
    M: Messenger + ?Sized,
{
    messenger.send_text(chat_id, WELCOME_TEXT).await?;
    info!("User {} started the bot", user);
    Ok(())
}

pub async fn handle_play<M>(
    messenger: &M,
    game: &GameSettings,
    chat_id: ChatId,
    user: &str,
) -> Result<()>
where
    M: Messenger + ?Sized,
{
    messenger
        .send_game_invite(chat_id, &game.short_name, play_keyboard())
        .await?;
    info!("User {} asked to play {}", user, game.short_name);
    Ok(())
}

/// Answer a callback query.
///
/// Fails open: if the answer cannot be delivered, the query is answered
/// again with the game URL. Only a failure of that fallback is returned.
pub async fn handle_callback<M>(
    messenger: &M,
    game: &GameSettings,
    query_id: &CallbackQueryId,
    game_short_name: Option<&str>,
    user: &str,
) -> Result<()>
where
    M: Messenger + ?Sized,
{
    info!(
        "Callback query from {} for game {:?}",
        user, game_short_name
    );

    let answer = CallbackAnswer::for_game(game, game_short_name);
    if let Err(e) = messenger.answer_callback(query_id, &answer).await {
        error!("Failed to answer callback query {}: {:#}", query_id.0, e);
        messenger
            .answer_callback(query_id, &CallbackAnswer::Url(game.url.clone()))
            .await
            .context("Fallback answer with game URL failed")?;
    }
    Ok(())
}

/// Route one incoming update to its handler
pub async fn dispatch<M>(messenger: &M, game: &GameSettings, incoming: Incoming) -> Result<()>
where
    M: Messenger + ?Sized,
{
    match incoming {
        Incoming::Command {
            chat_id,
            command: Command::Start,
            user,
        } => handle_start(messenger, chat_id, &user).await,
        Incoming::Command {
            chat_id,
            command: Command::Play,
            user,
        } => handle_play(messenger, game, chat_id, &user).await,
        Incoming::Callback {
            query_id,
            game_short_name,
            user,
        } => handle_callback(messenger, game, &query_id, game_short_name.as_deref(), &user).await,
    }
}
