//! Testing helpers and mock utilities.
//!
//! Provides convenient constructors for mocked transcription APIs and relay
//! transports.

use crate::relay::{MockRelayTransport, StatusMessageId};
use crate::transcription::{MockTranscriptionApi, ProgressResponse, ResultOutput, ResultResponse};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Status message id handed out by [`mock_transport_recording`]
pub const STATUS_ID: StatusMessageId = StatusMessageId(7);

/// Progress response that is still running
#[must_use]
pub fn running(status: Option<&str>) -> ProgressResponse {
    ProgressResponse {
        done: false,
        status: status.map(ToString::to_string),
    }
}

/// Progress response that has finished
#[must_use]
pub fn finished() -> ProgressResponse {
    ProgressResponse {
        done: true,
        status: None,
    }
}

/// Result response carrying `text`
#[must_use]
pub fn result_with(text: Option<&str>) -> ResultResponse {
    ResultResponse {
        output: ResultOutput {
            text: text.map(ToString::to_string),
        },
    }
}

/// Create a mock API that accepts the upload as `audio_id`, replays
/// `progress` in order (then reports done) and returns `result`.
///
/// # Example
///
/// ```rust,ignore
/// let api = mock_api_scripted("abc", vec![running(Some("queued"))], result_with(Some("hi")));
/// ```
#[must_use]
pub fn mock_api_scripted(
    audio_id: &'static str,
    progress: Vec<ProgressResponse>,
    result: ResultResponse,
) -> MockTranscriptionApi {
    let mut mock = MockTranscriptionApi::new();
    let mut queue: VecDeque<ProgressResponse> = progress.into();

    mock.expect_upload()
        .times(1)
        .returning(move |_| Ok(audio_id.to_string()));

    mock.expect_progress()
        .returning(move |_| Ok(queue.pop_front().unwrap_or_else(finished)));

    mock.expect_result().returning(move |_| Ok(result.clone()));

    mock
}

/// Create a mock transport that downloads `content`, hands out
/// [`STATUS_ID`] and records every status text (sent and edited) into `log`.
#[must_use]
pub fn mock_transport_recording(
    content: &'static [u8],
    log: Arc<Mutex<Vec<String>>>,
) -> MockRelayTransport {
    let mut mock = MockRelayTransport::new();

    let sent_log = Arc::clone(&log);
    mock.expect_send_status().times(1).returning(move |text| {
        if let Ok(mut entries) = sent_log.lock() {
            entries.push(text.to_string());
        }
        Ok(STATUS_ID)
    });

    mock.expect_edit_status().returning(move |_, text| {
        if let Ok(mut entries) = log.lock() {
            entries.push(text.to_string());
        }
        Ok(())
    });

    mock.expect_download()
        .returning(move |_| Ok(content.to_vec()));

    mock.expect_download_to_file().returning(move |_, path| {
        std::fs::write(path, content)?;
        Ok(())
    });

    mock
}
