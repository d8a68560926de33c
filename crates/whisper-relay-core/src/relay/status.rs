//! Status message texts and progress de-duplication.

/// Status shown while the service reports no stage of its own
pub const DEFAULT_PROGRESS_STATUS: &str = "Processing...";

/// Acknowledgment sent when an attachment arrives
#[must_use]
pub fn render_received(file_name: &str) -> String {
    format!("📥 Received file: {file_name}\nPreparing upload...")
}

/// In-progress status line
#[must_use]
pub fn render_progress(status: &str) -> String {
    format!("⏳ {status}")
}

/// Soft failure: the job finished without any text
#[must_use]
pub fn render_empty() -> String {
    "❌ Transcription finished, but no text was extracted.".to_string()
}

/// Hard failure notice; `detail` is shown when provided
#[must_use]
pub fn render_failure(detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("❌ Error: {detail}"),
        None => "❌ Something went wrong while transcribing this file.".to_string(),
    }
}

/// A progress status that differs from the one on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStatus {
    /// Status as reported (or the default)
    pub status: String,
    /// Text to put into the status message
    pub text: String,
}

/// Remembers the last progress status shown so repeats are not re-sent.
///
/// A status only counts as shown once [`StatusTracker::mark_displayed`] is
/// called, so an edit that failed is attempted again on the next poll.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last_displayed: Option<String>,
}

impl StatusTracker {
    /// Create a tracker that has displayed nothing yet
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_displayed: None,
        }
    }

    /// Returns the update to display if `status` differs from the last one shown.
    ///
    /// A missing or blank status is shown as [`DEFAULT_PROGRESS_STATUS`].
    #[must_use]
    pub fn next_update(&self, status: Option<&str>) -> Option<PendingStatus> {
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PROGRESS_STATUS);

        if self.last_displayed.as_deref() == Some(status) {
            return None;
        }
        Some(PendingStatus {
            status: status.to_string(),
            text: render_progress(status),
        })
    }

    /// Record that `update` is now on screen
    pub fn mark_displayed(&mut self, update: PendingStatus) {
        self.last_displayed = Some(update.status);
    }

    /// Last status shown, if any
    #[must_use]
    pub fn last_displayed(&self) -> Option<&str> {
        self.last_displayed.as_deref()
    }
}
