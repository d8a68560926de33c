//! Telegram transport settings.

use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use whisper_relay_core::config::RelaySettings;

/// Default read timeout for the Telegram Bot API (seconds): the longest
/// silence allowed while waiting for bytes. Must stay above the long-polling
/// timeout used by the dispatcher.
pub const TELEGRAM_HTTP_TIMEOUT_SECS: u64 = 30;
/// Default overall deadline of one Bot API request (seconds), sized for a
/// 20 MB file download on a slow link.
pub const TELEGRAM_REQUEST_DEADLINE_SECS: u64 = 300;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token (`TELEGRAM_BOT_TOKEN`).
    pub telegram_bot_token: String,
    /// Read timeout for the Bot API.
    #[serde(default = "default_http_timeout")]
    pub telegram_http_timeout_secs: u64,
    /// Overall deadline of one Bot API request, downloads included.
    #[serde(default = "default_request_deadline")]
    pub telegram_request_deadline_secs: u64,
}

const fn default_http_timeout() -> u64 {
    TELEGRAM_HTTP_TIMEOUT_SECS
}

const fn default_request_deadline() -> u64 {
    TELEGRAM_REQUEST_DEADLINE_SECS
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Relay settings shared across transport handlers.
    pub relay: Arc<RelaySettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(relay: RelaySettings, telegram: TelegramSettings) -> Self {
        Self {
            relay: Arc::new(relay),
            telegram: Arc::new(telegram),
        }
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the bot token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(whisper_relay_core::config::build_config()?)
    }

    /// Deserialize and validate settings from an already built config.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the bot token is missing or blank.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;
        if settings.telegram_bot_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_BOT_TOKEN environment variable is not set".to_string(),
            ));
        }
        Ok(settings)
    }

    /// Longest silence allowed while reading a Bot API response
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram_http_timeout_secs)
    }

    /// Overall deadline of one Bot API request, never below the read timeout
    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(
            self.telegram_request_deadline_secs
                .max(self.telegram_http_timeout_secs),
        )
    }
}
