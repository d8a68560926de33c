//! HTTP utilities for the transcription client
//!
//! Client construction and common response handling.

use super::TranscriptionError;
use crate::config::{RelaySettings, TRANSCRIPTION_CONNECT_TIMEOUT_SECS};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Longest error body kept in an `ApiError` message
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Creates an HTTP client carrying the headers the service requires.
///
/// Header values that are not valid HTTP header text are skipped with a warning.
#[must_use]
pub fn create_http_client(settings: &RelaySettings) -> HttpClient {
    let mut headers = HeaderMap::new();
    for (name, value) in [
        (REFERER, &settings.transcription_referer),
        (ORIGIN, &settings.transcription_origin),
        (USER_AGENT, &settings.transcription_user_agent),
    ] {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(name, v);
            }
            Err(e) => warn!(header = %name, error = %e, "Skipping invalid header value"),
        }
    }

    HttpClient::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(TRANSCRIPTION_CONNECT_TIMEOUT_SECS))
        .timeout(settings.http_timeout())
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Turns a non-success response into `TranscriptionError::ApiError`.
///
/// # Errors
///
/// Returns `ApiError` carrying the status and a cleaned body.
pub async fn ensure_success(response: Response) -> Result<Response, TranscriptionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(TranscriptionError::ApiError(format!(
        "{status} - {}",
        clean_error_body(&error_text)
    )))
}

/// Checks the status and decodes the JSON body.
///
/// # Errors
///
/// Returns `ApiError` on non-success status, `JsonError` on a malformed body,
/// `NetworkError`/`Timeout` if reading the body fails.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TranscriptionError> {
    let response = ensure_success(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| TranscriptionError::JsonError(e.to_string()))
}

/// HTML error pages from proxies are replaced by a marker; long bodies are truncated.
fn clean_error_body(text: &str) -> String {
    let trimmed = text.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        "(server returned HTML error page)".to_string()
    } else if text.chars().count() > MAX_ERROR_BODY_CHARS {
        format!(
            "{}... (truncated)",
            crate::utils::truncate_str(text, MAX_ERROR_BODY_CHARS)
        )
    } else {
        text.to_string()
    }
}
