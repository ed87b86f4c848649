//! Telegram bot that launches an externally hosted chess game.
//!
//! `/start` greets, `/play` sends the game, and the game's callback query is
//! answered with the game URL. Updates arrive either by long polling
//! ([`polling`]) or by webhook ([`webhook`]); both feed the same handlers in
//! [`bot`].

pub mod bot;
pub mod config;
pub mod platform;
pub mod polling;
pub mod webhook;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{mask_token, Config};

/// Install the global tracing subscriber (`RUST_LOG` overrides the default filter).
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chess_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load configuration from the TOML file given as first argument, or from
/// the environment (plus `.env`) when there is none.
pub fn load_config() -> Result<Config> {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                info!("Loaded environment from {}", path.display());
            }
            Config::from_env().context("Failed to load config from environment")?
        }
    };

    info!("Configuration loaded successfully");
    info!("  API_TOKEN: {}", mask_token(&config.telegram.bot_token));
    info!("  GAME_SHORT_NAME: {}", config.game.short_name);
    info!("  GAME_URL: {}", config.game.url);

    Ok(config)
}
