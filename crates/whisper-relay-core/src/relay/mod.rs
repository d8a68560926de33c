//! Relay pipeline
//!
//! One invocation takes one attachment through
//! acknowledge → admission → download → upload → poll → result → final edit.
//! All user-visible progress goes through a single status message that is
//! edited in place.

/// Attachment metadata and filename rules
pub mod attachment;
/// Admission gate bounding concurrent relays
pub mod gate;
/// Status message texts and de-duplication
pub mod status;
/// In-memory or temp-file payload storage
pub mod spool;

pub use attachment::{AttachmentKind, IncomingAttachment};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use spool::AttachmentPayload;
pub use status::{PendingStatus, StatusTracker};

use crate::config::{RelaySettings, SpoolMode};
use crate::transcription::{TranscriptionApi, TranscriptionError, UploadFile, WhisperClient};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Identifier of the status message inside the requesting chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusMessageId(pub i32);

/// Messaging-platform side of a relay, bound to one conversation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Send the status message and return its id
    async fn send_status(&self, text: &str) -> Result<StatusMessageId>;

    /// Replace the content of the status message
    async fn edit_status(&self, id: StatusMessageId, text: &str) -> Result<()>;

    /// Download the attachment into memory
    async fn download(&self, attachment: &IncomingAttachment) -> Result<Vec<u8>>;

    /// Download the attachment into the file at `path`
    async fn download_to_file(&self, attachment: &IncomingAttachment, path: &Path) -> Result<()>;
}

/// Hard failures of a relay invocation
#[derive(Debug, Error)]
pub enum RelayError {
    /// The status message could not be sent, so nothing was started
    #[error("Failed to acknowledge attachment: {0}")]
    Acknowledge(String),
    /// The admission gate was closed
    #[error("Admission gate closed")]
    Admission,
    /// Attachment bytes could not be retrieved
    #[error("Download failed: {0}")]
    Download(String),
    /// Upload request failed or returned no job id
    #[error("Upload failed: {0}")]
    Upload(#[source] TranscriptionError),
    /// Progress or result request failed
    #[error("Polling failed: {0}")]
    Poll(#[source] TranscriptionError),
    /// The remote job did not finish within the deadline
    #[error("Transcription did not finish within {}s", .0.as_secs())]
    PollTimeout(Duration),
}

/// Successful end states of a relay invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The service returned text
    Transcribed(String),
    /// The job finished without any text
    Empty,
}

/// Tunables of the pipeline
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    /// Delay between progress checks
    pub poll_interval: Duration,
    /// Overall poll deadline, `None` waits until the job is done
    pub poll_timeout: Option<Duration>,
    /// Where downloaded content is held
    pub spool_mode: SpoolMode,
    /// Include the error message in the failure notice
    pub show_error_detail: bool,
}

impl From<&RelaySettings> for RelayConfig {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            poll_timeout: settings.poll_timeout(),
            spool_mode: settings.spool_mode(),
            show_error_detail: settings.relay_show_error_detail,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from(&RelaySettings::default())
    }
}

/// Relays attachments to the transcription service.
///
/// Shared by every handler invocation; holds the admission gate.
pub struct Relay {
    api: Arc<dyn TranscriptionApi>,
    gate: AdmissionGate,
    config: RelayConfig,
}

impl Relay {
    /// Create a relay from its parts
    #[must_use]
    pub fn new(api: Arc<dyn TranscriptionApi>, gate: AdmissionGate, config: RelayConfig) -> Self {
        Self { api, gate, config }
    }

    /// Create a relay talking to the configured Whisper service
    #[must_use]
    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self::new(
            Arc::new(WhisperClient::new(settings)),
            AdmissionGate::new(settings.max_concurrent()),
            RelayConfig::from(settings),
        )
    }

    /// Admission gate used by this relay
    #[must_use]
    pub const fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Pipeline configuration
    #[must_use]
    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run one attachment through the pipeline and leave the status message
    /// in its final state.
    ///
    /// Errors are logged and rendered into the status message; the returned
    /// value only reports what happened.
    ///
    /// # Errors
    ///
    /// Returns the `RelayError` that ended the invocation.
    pub async fn handle<T>(
        &self,
        transport: &T,
        attachment: &IncomingAttachment,
    ) -> Result<RelayOutcome, RelayError>
    where
        T: RelayTransport + ?Sized,
    {
        let file_name = attachment.effective_file_name();
        info!(
            file_name = %file_name,
            kind = attachment.kind.label(),
            size = ?attachment.size,
            "Received attachment"
        );

        let status_id = match transport.send_status(&status::render_received(&file_name)).await {
            Ok(id) => id,
            Err(e) => {
                error!(file_name = %file_name, error = %e, "Failed to send status message");
                return Err(RelayError::Acknowledge(e.to_string()));
            }
        };

        let outcome = match self.gate.acquire().await {
            Ok(_permit) => {
                debug!(file_name = %file_name, in_flight = self.gate.in_flight(), "Admitted");
                self.process(transport, attachment, &file_name, status_id)
                    .await
            }
            Err(_) => Err(RelayError::Admission),
        };

        let final_text = match &outcome {
            Ok(RelayOutcome::Transcribed(text)) => {
                info!(file_name = %file_name, chars = text.chars().count(), "Transcription delivered");
                text.clone()
            }
            Ok(RelayOutcome::Empty) => {
                info!(file_name = %file_name, "Transcription finished without text");
                status::render_empty()
            }
            Err(e) => {
                error!(file_name = %file_name, error = %e, "Error handling attachment");
                let detail = e.to_string();
                status::render_failure(self.config.show_error_detail.then_some(detail.as_str()))
            }
        };

        if let Err(e) = transport.edit_status(status_id, &final_text).await {
            error!(file_name = %file_name, error = %e, "Failed to write final status");
        }

        outcome
    }

    /// Download → upload → poll → result. The payload (and its temp file) is
    /// released as soon as the upload has finished.
    async fn process<T>(
        &self,
        transport: &T,
        attachment: &IncomingAttachment,
        file_name: &str,
        status_id: StatusMessageId,
    ) -> Result<RelayOutcome, RelayError>
    where
        T: RelayTransport + ?Sized,
    {
        let mut payload = self.fetch(transport, attachment, file_name).await?;

        let upload = UploadFile {
            file_name: file_name.to_string(),
            mime_type: attachment.effective_mime_type(),
            body: payload.take_upload_body(),
        };
        let uploaded = self.api.upload(upload).await;
        drop(payload);
        let audio_id = uploaded.map_err(RelayError::Upload)?;
        info!(file_name = %file_name, audio_id = %audio_id, "Upload accepted");

        self.wait_for_completion(transport, status_id, &audio_id)
            .await?;

        let result = self
            .api
            .result(&audio_id)
            .await
            .map_err(RelayError::Poll)?;

        Ok(result
            .text()
            .map_or(RelayOutcome::Empty, |text| {
                RelayOutcome::Transcribed(text.to_string())
            }))
    }

    async fn fetch<T>(
        &self,
        transport: &T,
        attachment: &IncomingAttachment,
        file_name: &str,
    ) -> Result<AttachmentPayload, RelayError>
    where
        T: RelayTransport + ?Sized,
    {
        let payload = match self.config.spool_mode {
            SpoolMode::Memory => transport
                .download(attachment)
                .await
                .map(AttachmentPayload::InMemory)
                .map_err(|e| RelayError::Download(e.to_string()))?,
            SpoolMode::TempFile => {
                let file = spool::create_spool_file(file_name)
                    .map_err(|e| RelayError::Download(format!("temp file: {e}")))?;
                // On failure `file` is dropped here, which deletes it
                transport
                    .download_to_file(attachment, file.path())
                    .await
                    .map_err(|e| RelayError::Download(e.to_string()))?;
                AttachmentPayload::Spooled(file)
            }
        };

        debug!(
            file_name = %file_name,
            spool = self.config.spool_mode.label(),
            size = ?payload.size().ok(),
            "Attachment downloaded"
        );
        Ok(payload)
    }

    /// Polls until the job reports `done`, editing the status message only
    /// when the reported stage changes.
    async fn wait_for_completion<T>(
        &self,
        transport: &T,
        status_id: StatusMessageId,
        audio_id: &str,
    ) -> Result<(), RelayError>
    where
        T: RelayTransport + ?Sized,
    {
        let started = Instant::now();
        let mut tracker = StatusTracker::new();

        loop {
            let progress = self
                .api
                .progress(audio_id)
                .await
                .map_err(RelayError::Poll)?;
            if progress.done {
                return Ok(());
            }

            if let Some(update) = tracker.next_update(progress.status.as_deref()) {
                match transport.edit_status(status_id, &update.text).await {
                    Ok(()) => tracker.mark_displayed(update),
                    Err(e) => {
                        warn!(audio_id = %audio_id, error = %e, "Failed to update progress");
                    }
                }
            }

            if let Some(limit) = self.config.poll_timeout {
                if started.elapsed() >= limit {
                    return Err(RelayError::PollTimeout(limit));
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests;
