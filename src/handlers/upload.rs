//! # Audio Upload Handler
//!
//! ## Endpoint: `POST /upload`
//!
//! ## Request:
//! Multipart form data with one audio file in the field named "audio".
//! Other form fields are read and ignored.
//!
//! ## Response:
//! ```json
//! { "success": true, "file": "recording-1735732800000.wav" }
//! ```
//!
//! The file part is streamed to the recordings directory as it arrives, so
//! large recordings never sit in memory. Whenever the upload fails after a
//! file was opened, that file is removed again.

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{StorageError, StoredRecording};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Multipart field that carries the recording.
pub const AUDIO_FIELD: &str = "audio";

const SAVE_FAILED: &str = "Could not save recording";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file: String,
}

pub async fn upload_recording(
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let recording = match receive_upload(&state, payload).await {
        Ok(recording) => recording,
        Err(e) => {
            state.record_upload_failure();
            return Err(e);
        }
    };

    state.record_recording_stored(recording.size);
    info!(file = %recording.filename, bytes = recording.size, "Audio received");

    Ok(HttpResponse::Ok().json(UploadResponse {
        success: true,
        file: recording.filename,
    }))
}

/// Walk the multipart stream and store the single audio part.
async fn receive_upload(state: &AppState, mut payload: Multipart) -> AppResult<StoredRecording> {
    let mut stored: Option<StoredRecording> = None;

    while let Some(item) = payload.next().await {
        let field = match item {
            Ok(field) => field,
            Err(e) => {
                discard_stored(stored).await;
                return Err(AppError::BadRequest(format!("Malformed upload: {}", e)));
            }
        };

        let Some(original_name) = audio_filename(&field) else {
            if let Err(e) = drain(field).await {
                discard_stored(stored).await;
                return Err(e);
            }
            continue;
        };

        if stored.is_some() {
            discard_stored(stored).await;
            return Err(AppError::ValidationError(
                "Only one audio file is accepted".to_string(),
            ));
        }

        stored = Some(store_audio(state, field, &original_name).await?);
    }

    stored.ok_or_else(|| AppError::ValidationError("No audio file provided".to_string()))
}

/// The client filename of the "audio" part, or `None` for any other part.
///
/// An "audio" part without a filename is a plain text field, not a file.
fn audio_filename(field: &Field) -> Option<String> {
    let disposition = field.content_disposition()?;
    if disposition.get_name() != Some(AUDIO_FIELD) {
        return None;
    }
    disposition.get_filename().map(str::to_string)
}

async fn store_audio(state: &AppState, mut field: Field, original_name: &str) -> AppResult<StoredRecording> {
    let filename = state
        .recordings
        .filename_for(Some(original_name))
        .map_err(|e| match e {
            StorageError::UnsupportedExtension(ext) => {
                AppError::ValidationError(format!("Unsupported audio file type '.{}'", ext))
            }
            other => AppError::storage(SAVE_FAILED, other),
        })?;

    let mut writer = state.recordings.create(&filename).await.map_err(|e| {
        error!(file = %filename, error = %e, "Error opening recording for write");
        AppError::storage(SAVE_FAILED, e)
    })?;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(file = %filename, error = %e, "Upload stream ended early");
                writer.abort().await;
                return Err(AppError::BadRequest(format!("Malformed upload: {}", e)));
            }
        };

        if let Err(e) = writer.write_chunk(&chunk).await {
            error!(file = %filename, error = %e, "Error writing recording");
            writer.abort().await;
            return Err(AppError::storage(SAVE_FAILED, e));
        }
    }

    writer.finish().await.map_err(|e| {
        error!(file = %filename, error = %e, "Error flushing recording");
        AppError::storage(SAVE_FAILED, e)
    })
}

/// Consume a part we do not care about so the stream can move on.
async fn drain(mut field: Field) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::BadRequest(format!("Malformed upload: {}", e)))?;
    }
    Ok(())
}

async fn discard_stored(stored: Option<StoredRecording>) {
    if let Some(recording) = stored {
        if let Err(e) = tokio::fs::remove_file(&recording.path).await {
            warn!(file = %recording.filename, error = %e, "Failed to remove rejected recording");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{init_app, multipart_request, temp_state, Part};
    use actix_web::{http::StatusCode, test};

    fn stored_files(state: &AppState) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&state.paths.recordings)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[actix_web::test]
    async fn wav_upload_is_stored_verbatim() {
        let (_root, state) = temp_state();
        let app = init_app!(state);
        let audio: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        let req = multipart_request(&[Part::file(AUDIO_FIELD, "voice.wav", &audio)]).to_request();
        let resp: UploadResponse = test::call_and_read_body_json(&app, req).await;

        assert!(resp.success);
        let digits = resp
            .file
            .strip_prefix("recording-")
            .and_then(|rest| rest.strip_suffix(".wav"))
            .expect("recording-<digits>.wav");
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(std::fs::read(state.paths.recordings.join(&resp.file)).unwrap(), audio);
        assert_eq!(state.get_metrics_snapshot().recordings_stored, 1);
    }

    #[actix_web::test]
    async fn extra_text_fields_are_ignored() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = multipart_request(&[
            Part::text("note", "from the lock screen"),
            Part::file(AUDIO_FIELD, "clip.webm", b"webm bytes"),
        ]).to_request();
        let resp: UploadResponse = test::call_and_read_body_json(&app, req).await;

        assert!(resp.file.ends_with(".webm"));
        assert_eq!(stored_files(&state), vec![resp.file]);
    }

    #[actix_web::test]
    async fn blob_without_extension_is_accepted() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = multipart_request(&[Part::file(AUDIO_FIELD, "blob", b"raw")]).to_request();
        let resp: UploadResponse = test::call_and_read_body_json(&app, req).await;

        assert!(resp.file.starts_with("recording-"));
        assert!(!resp.file.contains('.'));
    }

    #[actix_web::test]
    async fn missing_audio_part_is_rejected() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = multipart_request(&[Part::text(AUDIO_FIELD, "not a file")]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "success": false, "error": "No audio file provided" }));
        assert!(stored_files(&state).is_empty());
    }

    #[actix_web::test]
    async fn disallowed_extension_writes_nothing() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = multipart_request(&[Part::file(AUDIO_FIELD, "../../run.sh", b"#!/bin/sh")]).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(stored_files(&state).is_empty());
        assert_eq!(state.get_metrics_snapshot().upload_failures, 1);
    }

    #[actix_web::test]
    async fn second_audio_part_rolls_back_the_first() {
        let (_root, state) = temp_state();
        let app = init_app!(state);

        let req = multipart_request(&[
            Part::file(AUDIO_FIELD, "one.wav", b"first"),
            Part::file(AUDIO_FIELD, "two.wav", b"second"),
        ]).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(stored_files(&state).is_empty());
    }

    #[actix_web::test]
    async fn missing_recordings_dir_is_a_storage_error() {
        let (_root, state) = temp_state();
        std::fs::remove_dir_all(&state.paths.recordings).unwrap();
        let app = init_app!(state);

        let req = multipart_request(&[Part::file(AUDIO_FIELD, "voice.wav", b"data")]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "success": false, "error": "Could not save recording" }));
    }
}
