use anyhow::Result;
use tracing::info;

use chess_bot::platform::telegram::build_bot;
use chess_bot::{init_logging, load_config, polling};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = load_config()?;
    let game = config.game_settings()?;
    let bot = build_bot(&config.telegram.bot_token, config.polling.request_timeout())?;

    info!("Bot is starting in polling mode...");
    polling::run(&bot, &game, &config.polling).await?;

    Ok(())
}
