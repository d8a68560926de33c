//! Holding downloaded attachment content until it is uploaded.

use crate::config::SpoolMode;
use crate::transcription::UploadBody;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Downloaded attachment content.
///
/// A spooled payload owns its temporary file; the file is removed when the
/// payload is dropped, on success and failure alike.
#[derive(Debug)]
pub enum AttachmentPayload {
    /// Content buffered in memory
    InMemory(Vec<u8>),
    /// Content written to a temporary file
    Spooled(NamedTempFile),
}

impl AttachmentPayload {
    /// Size of the content in bytes
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the spooled file metadata cannot be read.
    pub fn size(&self) -> io::Result<u64> {
        match self {
            Self::InMemory(bytes) => Ok(bytes.len() as u64),
            Self::Spooled(file) => Ok(file.as_file().metadata()?.len()),
        }
    }

    /// Path of the spooled file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InMemory(_) => None,
            Self::Spooled(file) => Some(file.path()),
        }
    }

    /// Upload body for this payload.
    ///
    /// In-memory content is moved out, leaving the buffer empty. Spooled
    /// content is referenced by path so the temp file stays owned (and cleaned
    /// up) by the payload.
    pub fn take_upload_body(&mut self) -> UploadBody {
        match self {
            Self::InMemory(bytes) => UploadBody::Bytes(std::mem::take(bytes)),
            Self::Spooled(file) => UploadBody::File(file.path().to_path_buf()),
        }
    }
}

/// Creates the temporary file an attachment is spooled into.
///
/// The file keeps the attachment's extension so tools inspecting it see the
/// right type.
///
/// # Errors
///
/// Returns an I/O error if the temp file cannot be created.
pub fn create_spool_file(file_name: &str) -> io::Result<NamedTempFile> {
    let suffix = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    tempfile::Builder::new()
        .prefix("whisper-relay-")
        .suffix(&suffix)
        .tempfile()
}

impl SpoolMode {
    /// Label for logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::TempFile => "tempfile",
        }
    }
}
