//! Configuration and settings management
//!
//! Loads relay settings from config files and environment variables and
//! defines the constants shared by the transport crates.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL of the remote transcription service
pub const DEFAULT_TRANSCRIPTION_BASE_URL: &str = "https://whisper0.hydev.org";
/// `Referer` header expected by the transcription service
pub const DEFAULT_TRANSCRIPTION_REFERER: &str = "https://whisper.hydev.org/";
/// `Origin` header expected by the transcription service
pub const DEFAULT_TRANSCRIPTION_ORIGIN: &str = "https://whisper.hydev.org";
/// Browser-like user agent sent with every transcription request
pub const DEFAULT_TRANSCRIPTION_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Per-request timeout for the transcription API (seconds)
pub const TRANSCRIPTION_HTTP_TIMEOUT_SECS: u64 = 120;
/// Connect timeout for the transcription API (seconds)
pub const TRANSCRIPTION_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of relays allowed past the admission gate at once
pub const RELAY_MAX_CONCURRENT: usize = 2;
/// Delay between two progress checks (milliseconds)
pub const RELAY_POLL_INTERVAL_MS: u64 = 2000;
/// Overall deadline for the poll loop (seconds). `0` waits forever.
pub const RELAY_POLL_TIMEOUT_SECS: u64 = 1800; // 30 minutes

/// Filename used when the platform does not provide one
pub const DEFAULT_FILE_NAME: &str = "audio_file";
/// Extension appended to filenames that have none
pub const DEFAULT_FILE_EXTENSION: &str = ".ogg";
/// MIME type used when the platform does not provide one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

// Telegram API retry configuration
/// Maximum attempts for a Telegram API operation
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff between Telegram API retries (milliseconds)
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for the Telegram API backoff (milliseconds)
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

/// Builds the layered configuration source shared by every settings struct.
///
/// Sources, in increasing priority: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` environment variables, plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg. `APP__RELAY_MAX_CONCURRENT=1`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// How downloaded attachments are held until upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoolMode {
    /// Keep the whole attachment in memory
    Memory,
    /// Stream the attachment into a temporary file deleted after the relay
    TempFile,
}

/// Relay settings loaded from the environment
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelaySettings {
    /// Base URL of the transcription service
    #[serde(default = "default_base_url")]
    pub transcription_base_url: String,
    /// `Referer` header value
    #[serde(default = "default_referer")]
    pub transcription_referer: String,
    /// `Origin` header value
    #[serde(default = "default_origin")]
    pub transcription_origin: String,
    /// `User-Agent` header value
    #[serde(default = "default_user_agent")]
    pub transcription_user_agent: String,
    /// Per-request timeout for the transcription API
    #[serde(default = "default_http_timeout")]
    pub transcription_http_timeout_secs: u64,

    /// Admission gate capacity
    #[serde(default = "default_max_concurrent")]
    pub relay_max_concurrent: usize,
    /// Delay between progress checks
    #[serde(default = "default_poll_interval")]
    pub relay_poll_interval_ms: u64,
    /// Overall poll deadline, `0` disables it
    #[serde(default = "default_poll_timeout")]
    pub relay_poll_timeout_secs: u64,
    /// Spool attachments to a temporary file instead of memory
    #[serde(default)]
    pub relay_spool_to_disk: bool,
    /// Include the error message in the user-facing failure notice
    #[serde(default = "default_true")]
    pub relay_show_error_detail: bool,
}

fn default_base_url() -> String {
    DEFAULT_TRANSCRIPTION_BASE_URL.to_string()
}

fn default_referer() -> String {
    DEFAULT_TRANSCRIPTION_REFERER.to_string()
}

fn default_origin() -> String {
    DEFAULT_TRANSCRIPTION_ORIGIN.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_TRANSCRIPTION_USER_AGENT.to_string()
}

const fn default_http_timeout() -> u64 {
    TRANSCRIPTION_HTTP_TIMEOUT_SECS
}

const fn default_max_concurrent() -> usize {
    RELAY_MAX_CONCURRENT
}

const fn default_poll_interval() -> u64 {
    RELAY_POLL_INTERVAL_MS
}

const fn default_poll_timeout() -> u64 {
    RELAY_POLL_TIMEOUT_SECS
}

const fn default_true() -> bool {
    true
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            transcription_base_url: default_base_url(),
            transcription_referer: default_referer(),
            transcription_origin: default_origin(),
            transcription_user_agent: default_user_agent(),
            transcription_http_timeout_secs: default_http_timeout(),
            relay_max_concurrent: default_max_concurrent(),
            relay_poll_interval_ms: default_poll_interval(),
            relay_poll_timeout_secs: default_poll_timeout(),
            relay_spool_to_disk: false,
            relay_show_error_detail: true,
        }
    }
}

impl RelaySettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Admission gate capacity, never below one
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.relay_max_concurrent.max(1)
    }

    /// Delay between two progress checks
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.relay_poll_interval_ms)
    }

    /// Overall poll deadline, `None` when disabled
    #[must_use]
    pub const fn poll_timeout(&self) -> Option<Duration> {
        if self.relay_poll_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.relay_poll_timeout_secs))
        }
    }

    /// Per-request timeout for the transcription API
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_http_timeout_secs)
    }

    /// Where downloaded attachments are held
    #[must_use]
    pub const fn spool_mode(&self) -> SpoolMode {
        if self.relay_spool_to_disk {
            SpoolMode::TempFile
        } else {
            SpoolMode::Memory
        }
    }
}
