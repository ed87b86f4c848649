//! Webhook delivery: Telegram POSTs each update to `/<token>`.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use reqwest::Url;
use teloxide::types::Update;
use teloxide::Bot;
use tracing::{debug, error, info, warn};

use crate::bot::{dispatch, GameSettings};
use crate::config::{redact, Config};
use crate::platform::telegram::to_incoming;
use crate::platform::{BotControl, Messenger};

pub const LIVENESS_TEXT: &str = "Chess Bot is running!";

#[derive(Clone)]
pub struct WebhookState {
    messenger: Arc<dyn Messenger>,
    game: Arc<GameSettings>,
    token: Arc<str>,
    bot_username: Arc<str>,
}

impl WebhookState {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        game: GameSettings,
        token: &str,
        bot_username: &str,
    ) -> Self {
        Self {
            messenger,
            game: Arc::new(game),
            token: Arc::from(token),
            bot_username: Arc::from(bot_username),
        }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/{token}", post(receive_update))
        .with_state(state)
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn receive_update(
    State(state): State<WebhookState>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<&'static str, StatusCode> {
    if token != *state.token {
        return Err(StatusCode::NOT_FOUND);
    }

    let update: Update = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected malformed update payload: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    match to_incoming(&update, &state.bot_username) {
        Some(incoming) => {
            // Telegram redelivers on non-2xx, so handler failures still answer "!"
            if let Err(e) = dispatch(state.messenger.as_ref(), &state.game, incoming).await {
                error!("Failed to handle update {}: {:#}", update.id.0, e);
            }
        }
        None => debug!("Ignoring update {}", update.id.0),
    }
    Ok("!")
}

/// Replace whatever webhook is registered with `url`.
pub async fn register<B>(bot: &B, url: &Url, token: &str) -> Result<()>
where
    B: BotControl + ?Sized,
{
    bot.clear_webhook(false)
        .await
        .context("Failed to remove old webhook")?;
    bot.register_webhook(url)
        .await
        .context("Failed to set webhook")?;
    info!("Webhook set: {}", redact(url.as_str(), token));
    Ok(())
}

/// Resolves when `signal` fires. A signal that cannot be installed never
/// resolves, so the server keeps running instead of stopping at once.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down webhook server");
}

/// Register the webhook and serve until Ctrl-C.
pub async fn run(bot: Bot, config: &Config) -> Result<()> {
    let game = config.game_settings()?;
    let url = config.webhook_url()?;
    let token = config.telegram.bot_token.as_str();

    let bot_username = bot.bot_username().await?;
    if let Err(e) = bot.register_commands().await {
        warn!("Failed to register bot commands: {:#}", e);
    }
    register(&bot, &url, token).await?;

    let state = WebhookState::new(Arc::new(bot), game, token, &bot_username);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Bot @{} is listening for webhooks on {}", bot_username, addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await
        .context("Server error")?;

    Ok(())
}
