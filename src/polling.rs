//! Long-polling delivery.
//!
//! Clears any webhook (Telegram refuses getUpdates while one is set), drains
//! stale updates, then pulls and dispatches updates one batch at a time.

use std::future::Future;

use anyhow::{Context, Result};
use teloxide::types::Update;
use tracing::{debug, error, info, warn};

use crate::bot::{dispatch, GameSettings};
use crate::config::PollingConfig;
use crate::platform::telegram::to_incoming;
use crate::platform::{BotControl, Messenger};

/// Maximum updates requested per getUpdates call
const BATCH_LIMIT: u8 = 100;

/// Offset confirming `update`. Update ids stay within 31 bits; saturate if not.
fn next_offset(update: &Update) -> i32 {
    i32::try_from(update.id.0)
        .unwrap_or(i32::MAX)
        .saturating_add(1)
}

/// Remove the webhook and drop pending updates. Returns the offset to poll from.
pub async fn prepare<B>(bot: &B, polling: &PollingConfig) -> Result<i32>
where
    B: BotControl + ?Sized,
{
    info!("Removing existing webhook...");
    bot.clear_webhook(true)
        .await
        .context("Failed to remove webhook before polling")?;

    // offset -1 confirms everything but the newest update, which we skip too
    let offset = match bot.fetch_updates(-1, 1, 0).await {
        Ok(updates) => {
            info!("Dropped pending updates");
            updates.last().map(next_offset).unwrap_or(0)
        }
        Err(e) => {
            warn!("Failed to drop pending updates: {:#}", e);
            0
        }
    };

    let settle = polling.settle_delay();
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    Ok(offset)
}

/// One getUpdates round-trip. Dispatch errors are logged, never returned;
/// the returned offset is past every update received.
pub async fn poll_once<B>(
    bot: &B,
    game: &GameSettings,
    bot_username: &str,
    offset: i32,
    timeout_secs: u32,
) -> Result<i32>
where
    B: Messenger + BotControl + ?Sized,
{
    let updates = bot.fetch_updates(offset, BATCH_LIMIT, timeout_secs).await?;
    let mut next = offset;
    for update in updates {
        next = next.max(next_offset(&update));
        match to_incoming(&update, bot_username) {
            Some(incoming) => {
                if let Err(e) = dispatch(bot, game, incoming).await {
                    error!("Failed to handle update {}: {:#}", update.id.0, e);
                }
            }
            None => debug!("Ignoring update {}", update.id.0),
        }
    }
    Ok(next)
}

/// Poll until `shutdown` resolves.
pub async fn run_until<B, S>(
    bot: &B,
    game: &GameSettings,
    polling: &PollingConfig,
    shutdown: S,
) -> Result<()>
where
    B: Messenger + BotControl + ?Sized,
    S: Future<Output = ()>,
{
    let mut offset = prepare(bot, polling).await?;

    if let Err(e) = bot.register_commands().await {
        warn!("Failed to register bot commands: {:#}", e);
    }
    let bot_username = bot.bot_username().await?;
    info!("Bot @{} is polling for updates", bot_username);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Polling stopped");
                return Ok(());
            }
            result = poll_once(bot, game, &bot_username, offset, polling.long_poll_timeout_secs) => {
                match result {
                    Ok(next) => offset = next,
                    Err(e) => {
                        error!("Polling failed: {:#}", e);
                        tokio::time::sleep(polling.error_pause()).await;
                    }
                }
            }
        }
    }
}

/// Poll until Ctrl-C.
pub async fn run<B>(bot: &B, game: &GameSettings, polling: &PollingConfig) -> Result<()>
where
    B: Messenger + BotControl + ?Sized,
{
    run_until(bot, game, polling, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}
