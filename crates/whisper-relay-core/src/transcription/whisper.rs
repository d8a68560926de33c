use super::http_utils;
use super::{
    ProgressResponse, ResultResponse, TranscriptionApi, TranscriptionError, UploadBody,
    UploadFile, UploadResponse,
};
use crate::config::RelaySettings;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client as HttpClient};
use tracing::{debug, info};

/// Client for the hosted Whisper transcription service
pub struct WhisperClient {
    http_client: HttpClient,
    base_url: String,
}

impl WhisperClient {
    /// Create a client from relay settings
    #[must_use]
    pub fn new(settings: &RelaySettings) -> Self {
        Self::with_http_client(
            http_utils::create_http_client(settings),
            &settings.transcription_base_url,
        )
    }

    /// Create a client around an existing HTTP client
    #[must_use]
    pub fn with_http_client(http_client: HttpClient, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn build_part(file: UploadFile) -> Result<Part, TranscriptionError> {
        let part = match file.body {
            UploadBody::Bytes(bytes) => Part::bytes(bytes),
            UploadBody::File(path) => {
                let handle = tokio::fs::File::open(&path).await.map_err(|e| {
                    TranscriptionError::NetworkError(format!(
                        "failed to open spooled file {}: {e}",
                        path.display()
                    ))
                })?;
                let len = handle
                    .metadata()
                    .await
                    .map_err(|e| TranscriptionError::NetworkError(e.to_string()))?
                    .len();
                Part::stream_with_length(Body::from(handle), len)
            }
        };

        part.file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|e| TranscriptionError::NetworkError(format!("invalid MIME type: {e}")))
    }
}

#[async_trait]
impl TranscriptionApi for WhisperClient {
    async fn upload(&self, file: UploadFile) -> Result<String, TranscriptionError> {
        let url = format!("{}/upload", self.base_url);
        info!(file_name = %file.file_name, mime_type = %file.mime_type, "Uploading file");

        let form = Form::new().part("file", Self::build_part(file).await?);
        let response = self.http_client.post(&url).multipart(form).send().await?;
        let upload: UploadResponse = http_utils::read_json(response).await?;

        let audio_id = upload
            .audio_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(TranscriptionError::MissingAudioId)?;
        debug!(audio_id = %audio_id, "Upload accepted");
        Ok(audio_id)
    }

    async fn progress(&self, audio_id: &str) -> Result<ProgressResponse, TranscriptionError> {
        let url = format!("{}/progress/{audio_id}", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        http_utils::read_json(response).await
    }

    async fn result(&self, audio_id: &str) -> Result<ResultResponse, TranscriptionError> {
        let url = format!("{}/result/{audio_id}.json", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        http_utils::read_json(response).await
    }
}
