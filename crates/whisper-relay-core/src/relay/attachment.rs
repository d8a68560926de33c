//! Attachments received from the messaging platform.

use crate::config::{DEFAULT_FILE_EXTENSION, DEFAULT_FILE_NAME, DEFAULT_MIME_TYPE};

/// Kind of message the attachment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Voice note recorded in the client
    Voice,
    /// Audio file sent as music
    Audio,
    /// Any file sent as a document
    Document,
}

impl AttachmentKind {
    /// Short label for logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }
}

/// Attachment metadata; the content is fetched later through the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingAttachment {
    /// Platform file identifier used for the download
    pub file_id: String,
    /// Where the attachment came from
    pub kind: AttachmentKind,
    /// Platform-provided filename
    pub file_name: Option<String>,
    /// Platform-provided MIME type
    pub mime_type: Option<String>,
    /// Size in bytes, if known
    pub size: Option<u64>,
}

impl IncomingAttachment {
    /// Filename sent to the transcription service.
    ///
    /// Falls back to `audio_file` and appends `.ogg` when the name has no
    /// extension, so the multipart upload is always well-formed.
    #[must_use]
    pub fn effective_file_name(&self) -> String {
        resolve_file_name(self.file_name.as_deref())
    }

    /// MIME type sent to the transcription service
    #[must_use]
    pub fn effective_mime_type(&self) -> String {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string()
    }
}

/// Applies the default name and extension rules to a platform filename.
#[must_use]
pub fn resolve_file_name(file_name: Option<&str>) -> String {
    let mut name = file_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_FILE_NAME)
        .to_string();
    if !name.contains('.') {
        name.push_str(DEFAULT_FILE_EXTENSION);
    }
    name
}
