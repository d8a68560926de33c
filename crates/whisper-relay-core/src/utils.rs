//! Text helpers and the Telegram retry wrapper.

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};
use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::{Retry, RetryIf};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Splits text into chunks of at most `max_chars` characters.
///
/// Chunks break after the last newline or whitespace that fits; a word longer
/// than `max_chars` is cut on grapheme boundaries. Whitespace at the cut
/// points is trimmed.
///
/// # Examples
///
/// ```
/// use whisper_relay_core::utils::split_text;
/// let parts = split_text("one two three", 8);
/// assert_eq!(parts, vec!["one two", "three"]);
/// ```
#[must_use]
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        // Byte offset just past the first `max_chars` graphemes that fit
        let mut limit = 0;
        let mut used = 0;
        for grapheme in rest.graphemes(true) {
            let width = grapheme.chars().count();
            if used + width > max_chars {
                break;
            }
            used += width;
            limit += grapheme.len();
        }
        if limit == 0 {
            // A single grapheme wider than the limit still has to go somewhere
            limit = rest.graphemes(true).next().map_or(rest.len(), str::len);
        }

        let window = &rest[..limit];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|&pos| pos > 0)
            .unwrap_or(limit);

        let head = rest[..cut].trim_end();
        if !head.is_empty() {
            parts.push(head.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// # Examples
///
/// ```
/// use whisper_relay_core::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Backoff starts at 500ms, is capped at 4s, carries jitter and gives up
/// after 3 attempts (see the `TELEGRAM_API_*` constants in `config`).
///
/// # Errors
///
/// Returns the last error if every attempt fails.
///
/// # Examples
///
/// ```no_run
/// use whisper_relay_core::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn download_file() -> Result<Vec<u8>> {
///     Ok(vec![])
/// }
///
/// # async fn example() -> Result<()> {
/// let buffer = retry_telegram_operation(|| async {
///     download_file().await
/// }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    Retry::spawn(telegram_backoff(), operation)
        .await
        .map_err(|e| {
            warn!(
                "Telegram API operation failed after {} attempts: {}",
                TELEGRAM_API_MAX_RETRIES, e
            );
            e
        })
}

/// Like [`retry_telegram_operation`], but an error is only retried when
/// `should_retry` accepts it. Use it for operations that are not safe to
/// repeat blindly, such as sending a message.
///
/// # Errors
///
/// Returns the first rejected error, or the last error once all attempts
/// have failed.
pub async fn retry_telegram_operation_if<F, Fut, T, C>(operation: F, should_retry: C) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    C: FnMut(&anyhow::Error) -> bool,
{
    RetryIf::spawn(telegram_backoff(), operation, should_retry)
        .await
        .map_err(|e| {
            warn!("Telegram API operation failed: {}", e);
            e
        })
}

// `take` counts retries, the first attempt is not included
fn telegram_backoff() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES - 1)
}
