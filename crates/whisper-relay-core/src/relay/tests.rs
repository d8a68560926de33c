use super::*;
use crate::testing::{
    finished, mock_api_scripted, mock_transport_recording, result_with, running, STATUS_ID,
};
use crate::transcription::{MockTranscriptionApi, UploadBody};
use std::path::PathBuf;
use std::sync::Mutex;

fn voice_note() -> IncomingAttachment {
    IncomingAttachment {
        file_id: "voice-1".to_string(),
        kind: AttachmentKind::Voice,
        file_name: None,
        mime_type: Some("audio/ogg".to_string()),
        size: Some(4),
    }
}

fn config(spool_mode: SpoolMode) -> RelayConfig {
    RelayConfig {
        poll_interval: Duration::from_secs(2),
        poll_timeout: None,
        spool_mode,
        show_error_detail: true,
    }
}

fn relay(api: MockTranscriptionApi, config: RelayConfig) -> Relay {
    Relay::new(Arc::new(api), AdmissionGate::new(1), config)
}

fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().expect("log mutex poisoned").clone()
}

#[tokio::test(start_paused = true)]
async fn round_trip_delivers_exact_text() {
    let api = mock_api_scripted(
        "abc",
        vec![
            running(Some("queued")),
            running(Some("transcribing")),
            finished(),
        ],
        result_with(Some("hello world")),
    );
    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));
    let relay = relay(api, config(SpoolMode::Memory));

    let outcome = relay.handle(&transport, &voice_note()).await;

    assert_eq!(
        outcome.expect("relay should succeed"),
        RelayOutcome::Transcribed("hello world".to_string())
    );
    assert_eq!(
        entries(&log),
        vec![
            "📥 Received file: audio_file.ogg\nPreparing upload...".to_string(),
            "⏳ queued".to_string(),
            "⏳ transcribing".to_string(),
            "hello world".to_string(),
        ]
    );
    assert_eq!(relay.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_status_is_edited_once() {
    let api = mock_api_scripted(
        "abc",
        vec![
            running(Some("queued")),
            running(Some("queued")),
            running(Some("queued")),
            finished(),
        ],
        result_with(Some("done")),
    );
    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));

    let outcome = relay(api, config(SpoolMode::Memory))
        .handle(&transport, &voice_note())
        .await;

    assert!(outcome.is_ok());
    let queued_edits = entries(&log)
        .iter()
        .filter(|text| text.as_str() == "⏳ queued")
        .count();
    assert_eq!(queued_edits, 1);
}

#[tokio::test(start_paused = true)]
async fn missing_text_is_soft_failure() {
    let api = mock_api_scripted("abc", vec![finished()], result_with(None));
    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));

    let outcome = relay(api, config(SpoolMode::Memory))
        .handle(&transport, &voice_note())
        .await;

    assert_eq!(outcome.expect("soft failure is not an error"), RelayOutcome::Empty);
    assert_eq!(entries(&log).last(), Some(&status::render_empty()));
}

#[tokio::test(start_paused = true)]
async fn upload_error_reports_failure_and_releases_permit() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload().times(1).returning(|_| {
        Err(TranscriptionError::ApiError(
            "500 Internal Server Error - boom".to_string(),
        ))
    });
    api.expect_progress().never();
    api.expect_result().never();

    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));
    let relay = relay(api, config(SpoolMode::Memory));

    let outcome = relay.handle(&transport, &voice_note()).await;

    assert!(matches!(outcome, Err(RelayError::Upload(_))));
    let last = entries(&log).last().cloned().unwrap_or_default();
    assert!(last.starts_with("❌ Error: Upload failed"), "got: {last}");
    assert!(relay.gate().try_acquire().is_some());
}

#[tokio::test(start_paused = true)]
async fn download_failure_never_uploads() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload().never();
    api.expect_progress().never();
    api.expect_result().never();

    let edits = Arc::new(Mutex::new(Vec::new()));
    let edits_clone = Arc::clone(&edits);
    let mut transport = MockRelayTransport::new();
    transport
        .expect_send_status()
        .times(1)
        .returning(|_| Ok(STATUS_ID));
    transport
        .expect_download()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("file is too big")));
    transport.expect_edit_status().returning(move |_, text| {
        edits_clone
            .lock()
            .expect("edits mutex poisoned")
            .push(text.to_string());
        Ok(())
    });

    let outcome = relay(api, config(SpoolMode::Memory))
        .handle(&transport, &voice_note())
        .await;

    assert!(matches!(outcome, Err(RelayError::Download(_))));
    assert_eq!(
        entries(&edits),
        vec!["❌ Error: Download failed: file is too big".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_acknowledgment_starts_nothing() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload().never();

    let mut transport = MockRelayTransport::new();
    transport
        .expect_send_status()
        .returning(|_| Err(anyhow::anyhow!("chat not found")));
    transport.expect_download().never();
    transport.expect_edit_status().never();

    let relay = relay(api, config(SpoolMode::Memory));
    let outcome = relay.handle(&transport, &voice_note()).await;

    assert!(matches!(outcome, Err(RelayError::Acknowledge(_))));
    assert_eq!(relay.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_deadline_ends_the_wait() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload()
        .returning(|_| Ok("slow".to_string()));
    api.expect_progress()
        .returning(|_| Ok(running(Some("queued"))));
    api.expect_result().never();

    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));
    let config = RelayConfig {
        poll_timeout: Some(Duration::from_secs(10)),
        ..config(SpoolMode::Memory)
    };

    let outcome = relay(api, config).handle(&transport, &voice_note()).await;

    assert!(matches!(outcome, Err(RelayError::PollTimeout(d)) if d == Duration::from_secs(10)));
    // One progress edit, then the failure notice
    assert_eq!(entries(&log).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn progress_error_is_a_poll_failure() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload().returning(|_| Ok("abc".to_string()));
    api.expect_progress()
        .returning(|_| Err(TranscriptionError::JsonError("expected value".to_string())));
    api.expect_result().never();

    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));

    let outcome = relay(api, config(SpoolMode::Memory))
        .handle(&transport, &voice_note())
        .await;

    assert!(matches!(outcome, Err(RelayError::Poll(_))));
}

#[tokio::test(start_paused = true)]
async fn hidden_error_detail_uses_generic_notice() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload()
        .returning(|_| Err(TranscriptionError::MissingAudioId));

    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));
    let config = RelayConfig {
        show_error_detail: false,
        ..config(SpoolMode::Memory)
    };

    let outcome = relay(api, config).handle(&transport, &voice_note()).await;

    assert!(outcome.is_err());
    assert_eq!(entries(&log).last(), Some(&status::render_failure(None)));
}

#[tokio::test(start_paused = true)]
async fn spooled_file_is_uploaded_then_removed() {
    let seen_path: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&seen_path);

    let mut api = MockTranscriptionApi::new();
    api.expect_upload().times(1).returning(move |file| {
        assert_eq!(file.file_name, "audio_file.ogg");
        assert_eq!(file.mime_type, "audio/ogg");
        let UploadBody::File(path) = file.body else {
            panic!("expected a spooled upload");
        };
        assert_eq!(std::fs::read(&path).expect("spool file readable"), b"OggS");
        *seen.lock().expect("path mutex poisoned") = Some(path);
        Err(TranscriptionError::ApiError("500 Internal Server Error".to_string()))
    });

    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));
    let relay = relay(api, config(SpoolMode::TempFile));

    let outcome = relay.handle(&transport, &voice_note()).await;

    assert!(matches!(outcome, Err(RelayError::Upload(_))));
    let path = seen_path
        .lock()
        .expect("path mutex poisoned")
        .clone()
        .expect("upload should have seen the spool file");
    assert!(!path.exists(), "spool file left behind at {}", path.display());
    assert_eq!(relay.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn queued_relay_is_acknowledged_but_not_uploaded() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload().never();

    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));
    let relay = Arc::new(relay(api, config(SpoolMode::Memory)));

    let held = relay.gate().acquire().await.expect("gate open");
    let task = {
        let relay = Arc::clone(&relay);
        tokio::spawn(async move {
            let _ = relay.handle(&transport, &voice_note()).await;
        })
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(entries(&log).len(), 1, "only the acknowledgment is sent");
    assert!(!task.is_finished());

    task.abort();
    drop(held);
}

#[tokio::test(start_paused = true)]
async fn result_error_is_a_poll_failure() {
    let mut api = MockTranscriptionApi::new();
    api.expect_upload().returning(|_| Ok("abc".to_string()));
    api.expect_progress().returning(|_| Ok(finished()));
    api.expect_result()
        .times(1)
        .returning(|_| Err(TranscriptionError::JsonError("bad".to_string())));

    let log = Arc::new(Mutex::new(Vec::new()));
    let transport = mock_transport_recording(b"OggS", Arc::clone(&log));
    let relay = relay(api, config(SpoolMode::Memory));

    let outcome = relay.handle(&transport, &voice_note()).await;

    assert!(matches!(
        outcome,
        Err(RelayError::Poll(TranscriptionError::JsonError(_)))
    ));
    let last = entries(&log).last().cloned().unwrap_or_default();
    assert!(last.starts_with("❌ Error: Polling failed"), "got: {last}");
    assert_eq!(relay.gate().available(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_progress_edit_is_retried_and_relay_continues() {
    let api = mock_api_scripted(
        "abc",
        vec![running(Some("queued")), running(Some("queued")), finished()],
        result_with(Some("hello world")),
    );

    let attempts = Arc::new(Mutex::new(Vec::new()));
    let attempts_clone = Arc::clone(&attempts);
    let mut transport = MockRelayTransport::new();
    transport
        .expect_send_status()
        .times(1)
        .returning(|_| Ok(STATUS_ID));
    transport
        .expect_download()
        .returning(|_| Ok(b"OggS".to_vec()));
    transport.expect_edit_status().returning(move |_, text| {
        let mut seen = attempts_clone.lock().expect("attempts mutex poisoned");
        seen.push(text.to_string());
        if seen.len() == 1 {
            return Err(anyhow::anyhow!("Too Many Requests"));
        }
        Ok(())
    });

    let outcome = relay(api, config(SpoolMode::Memory))
        .handle(&transport, &voice_note())
        .await;

    assert_eq!(
        outcome.expect("a failed progress edit does not end the relay"),
        RelayOutcome::Transcribed("hello world".to_string())
    );
    assert_eq!(
        entries(&attempts),
        vec![
            "⏳ queued".to_string(),
            "⏳ queued".to_string(),
            "hello world".to_string(),
        ]
    );
}
