//! Webhook entry point.
//!
//! Registers `https://$RAILWAY_DOMAIN/$API_TOKEN` with Telegram and serves
//! it on `0.0.0.0:$PORT`. `GET /` answers a liveness string.

use anyhow::Result;
use tracing::info;

use chess_bot::platform::telegram::build_bot;
use chess_bot::{init_logging, load_config, webhook};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = load_config()?;
    let bot = build_bot(&config.telegram.bot_token, config.polling.request_timeout())?;

    info!("Bot is starting in webhook mode...");
    webhook::run(bot, &config).await?;

    Ok(())
}
