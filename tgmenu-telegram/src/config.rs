//! Telegram connection, logging and session timing. Loaded from env.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use tgmenu_session::SessionConfig;

/// Default log file path.
pub const DEFAULT_LOG_FILE: &str = "logs/tgmenu.log";
/// Default command that (re)starts a chat session.
pub const DEFAULT_START_COMMAND: &str = "start";

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// BOT_TOKEN
    pub bot_token: String,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram_api_url: Option<String>,
    /// LOG_FILE
    pub log_file: String,
    /// MENU_START_COMMAND, without the leading slash
    pub start_command: String,
    /// MENU_SWEEP_INTERVAL_SECS, MENU_POLL_WINDOW_SECS, MENU_DEFAULT_PICTURE
    pub session: SessionConfig,
}

impl TelegramConfig {
    /// Loads from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let start_command =
            env::var("MENU_START_COMMAND").unwrap_or_else(|_| DEFAULT_START_COMMAND.to_string());

        let mut session = SessionConfig::default();
        if let Some(secs) = env_secs("MENU_SWEEP_INTERVAL_SECS")? {
            session.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("MENU_POLL_WINDOW_SECS")? {
            session.poll_window = Duration::from_secs(secs);
        }
        if let Ok(picture) = env::var("MENU_DEFAULT_PICTURE") {
            session.default_picture = picture;
        }

        Ok(Self {
            bot_token,
            telegram_api_url,
            log_file,
            start_command,
            session,
        })
    }

    /// Uses the given token; everything else at defaults.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            telegram_api_url: None,
            log_file: DEFAULT_LOG_FILE.to_string(),
            start_command: DEFAULT_START_COMMAND.to_string(),
            session: SessionConfig::default(),
        }
    }

    /// Fails on an empty token, an unparsable API URL or invalid session timing.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("BOT_TOKEN is empty");
        }
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        self.session.validate()?;
        Ok(())
    }
}

fn env_secs(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a whole number of seconds: {}", name, value)),
        Err(_) => Ok(None),
    }
}
