use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::bot::GameSettings;

/// Documented placeholder for the public domain; webhook mode refuses to run with it.
pub const DOMAIN_PLACEHOLDER: &str = "YOUR_RAILWAY_DOMAIN_HERE";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    #[serde(default = "default_short_name")]
    pub short_name: String,
    #[serde(default = "default_game_url")]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Public host Telegram pushes updates to, without scheme (e.g. "chess-bot.up.railway.app")
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Upper bound on any single Bot API round-trip.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long Telegram may hold a getUpdates call open.
    #[serde(default = "default_long_poll_timeout_secs")]
    pub long_poll_timeout_secs: u32,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_error_pause_ms")]
    pub error_pause_ms: u64,
}

fn default_short_name() -> String {
    "Chess".to_string()
}

fn default_game_url() -> String {
    "https://pavel-chess-game.netlify.app".to_string()
}

fn default_domain() -> String {
    DOMAIN_PLACEHOLDER.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_long_poll_timeout_secs() -> u32 {
    5
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_error_pause_ms() -> u64 {
    1000
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            short_name: default_short_name(),
            url: default_game_url(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            long_poll_timeout_secs: default_long_poll_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            error_pause_ms: default_error_pause_ms(),
        }
    }
}

impl PollingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.error_pause_ms)
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the process environment (after `.env`, if the caller loaded one).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("API_TOKEN").context("API_TOKEN is not set")?;
        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {raw}"))?,
            None => default_port(),
        };

        let config = Config {
            telegram: TelegramConfig { bot_token },
            game: GameConfig {
                short_name: get("GAME_SHORT_NAME").unwrap_or_else(default_short_name),
                url: get("GAME_URL").unwrap_or_else(default_game_url),
            },
            webhook: WebhookConfig {
                domain: get("RAILWAY_DOMAIN").unwrap_or_else(default_domain),
                port,
                ..WebhookConfig::default()
            },
            polling: PollingConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("Telegram bot token is empty");
        }
        self.game_settings()?;
        if self.polling.request_timeout_secs <= u64::from(self.polling.long_poll_timeout_secs) {
            bail!(
                "request_timeout_secs ({}) must exceed long_poll_timeout_secs ({})",
                self.polling.request_timeout_secs,
                self.polling.long_poll_timeout_secs
            );
        }
        Ok(())
    }

    pub fn game_settings(&self) -> Result<GameSettings> {
        GameSettings::new(&self.game.short_name, &self.game.url)
    }

    /// `https://<domain>/<token>`, the URL registered with Telegram.
    pub fn webhook_url(&self) -> Result<Url> {
        let domain = self.webhook.domain.trim().trim_end_matches('/');
        if domain.is_empty() || domain == DOMAIN_PLACEHOLDER {
            bail!("RAILWAY_DOMAIN is not configured; set it to the bot's public host");
        }
        let raw = format!("https://{}/{}", domain, self.telegram.bot_token);
        Url::parse(&raw).with_context(|| format!("Invalid webhook domain: {domain}"))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.webhook.host, self.webhook.port)
    }
}

/// Hide all but the last 8 characters of a secret for logging.
pub fn mask_token(token: &str) -> String {
    const VISIBLE: usize = 8;
    let len = token.chars().count();
    if len <= VISIBLE {
        return "*".repeat(len.max(3));
    }
    let tail: String = token.chars().skip(len - VISIBLE).collect();
    format!("{}{}", "*".repeat(len - VISIBLE), tail)
}

/// Same as [`mask_token`] but applied to every occurrence inside `text` (URLs, paths).
pub fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(token, &mask_token(token))
}
