//! Remote transcription service
//!
//! The service is a three-endpoint HTTP API: upload a file, poll its
//! progress, fetch the finished result.

mod http_utils;
/// Reqwest-backed client for the hosted Whisper service
pub mod whisper;

pub use whisper::WhisperClient;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while talking to the transcription service
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Connectivity problem before a response arrived
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Request exceeded its timeout
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// Service answered with a non-success status
    #[error("API error: {0}")]
    ApiError(String),
    /// Response body was not the expected JSON
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Upload response carried no usable `audio_id`
    #[error("Upload response did not contain an audio_id")]
    MissingAudioId,
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else {
            Self::NetworkError(e.to_string())
        }
    }
}

/// File handed to the upload endpoint
#[derive(Debug)]
pub struct UploadFile {
    /// Name sent in the multipart part
    pub file_name: String,
    /// MIME type sent in the multipart part
    pub mime_type: String,
    /// Content of the file
    pub body: UploadBody,
}

/// Content source for an upload
#[derive(Debug)]
pub enum UploadBody {
    /// Bytes already held in memory
    Bytes(Vec<u8>),
    /// A file on disk, streamed into the request
    File(std::path::PathBuf),
}

/// Response of `POST /upload`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Remote job identifier
    pub audio_id: Option<String>,
}

/// Response of `GET /progress/{audio_id}`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProgressResponse {
    /// Whether the job has finished
    #[serde(default)]
    pub done: bool,
    /// Human-readable stage description
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `GET /result/{audio_id}.json`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ResultResponse {
    /// Transcription payload
    #[serde(default)]
    pub output: ResultOutput,
}

/// `output` object of a result response
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ResultOutput {
    /// Transcribed text
    #[serde(default)]
    pub text: Option<String>,
}

impl ResultResponse {
    /// Transcribed text, `None` when absent or blank
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.output
            .text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Interface of the remote transcription service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TranscriptionApi: Send + Sync {
    /// Upload a file and return the remote job id
    async fn upload(&self, file: UploadFile) -> Result<String, TranscriptionError>;

    /// Check the progress of a remote job
    async fn progress(&self, audio_id: &str) -> Result<ProgressResponse, TranscriptionError>;

    /// Fetch the finished result of a remote job
    async fn result(&self, audio_id: &str) -> Result<ResultResponse, TranscriptionError>;
}
