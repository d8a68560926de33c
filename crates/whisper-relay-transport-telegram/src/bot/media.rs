//! Attachment extraction from Telegram messages.

use teloxide::types::Message;
use whisper_relay_core::relay::{AttachmentKind, IncomingAttachment};

/// Largest file the Bot API lets a bot download (20 MB)
pub const TELEGRAM_MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Returns the attachment a message carries, checking voice, audio and
/// document in that order. Messages without one yield `None`.
#[must_use]
pub fn extract_attachment(msg: &Message) -> Option<IncomingAttachment> {
    if let Some(voice) = msg.voice() {
        return Some(IncomingAttachment {
            file_id: voice.file.id.0.clone(),
            kind: AttachmentKind::Voice,
            file_name: None,
            mime_type: voice.mime_type.as_ref().map(ToString::to_string),
            size: Some(u64::from(voice.file.size)),
        });
    }

    if let Some(audio) = msg.audio() {
        return Some(IncomingAttachment {
            file_id: audio.file.id.0.clone(),
            kind: AttachmentKind::Audio,
            file_name: audio.file_name.clone(),
            mime_type: audio.mime_type.as_ref().map(ToString::to_string),
            size: Some(u64::from(audio.file.size)),
        });
    }

    msg.document().map(|doc| IncomingAttachment {
        file_id: doc.file.id.0.clone(),
        kind: AttachmentKind::Document,
        file_name: doc.file_name.clone(),
        mime_type: doc.mime_type.as_ref().map(ToString::to_string),
        size: Some(u64::from(doc.file.size)),
    })
}

/// Whether the Bot API will refuse to serve this attachment
#[must_use]
pub fn exceeds_download_limit(attachment: &IncomingAttachment) -> bool {
    attachment
        .size
        .is_some_and(|size| size > TELEGRAM_MAX_DOWNLOAD_BYTES)
}
