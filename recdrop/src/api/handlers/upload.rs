use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use tracing::{debug, info, trace};

use crate::AppState;
use crate::api::models::upload::UploadResponse;
use crate::errors::{Error, Result};
use crate::upload::validator::{DEFAULT_MIME_TYPE, check_file_field};
use crate::upload::{PendingRecording, RecordingMetadata};

const ROOM_FIELD: &str = "room";
const TIMESTAMP_FIELD: &str = "timestamp";

fn multipart_error(e: MultipartError, limit_bytes: u64) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::PayloadTooLarge { limit_bytes };
    }
    Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e.body_text()),
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "upload",
    summary = "Upload recording",
    description = "Store one audio/webm recording as `recording_<room>_<timestamp>.webm`. \
                   `room` defaults to `call` and `timestamp` to the server time of the upload. \
                   An existing recording with the same name is replaced.",
    request_body(
        content_type = "multipart/form-data",
        description = "`file` (audio/webm blob), optional `room` and `timestamp` text fields"
    ),
    responses(
        (status = 200, description = "Recording stored", body = UploadResponse),
        (status = 400, description = "No file, invalid mimetype, unexpected field or malformed multipart body", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or wrong bearer token", body = crate::errors::ErrorResponse),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse),
        (status = 500, description = "Recording could not be written", body = crate::errors::ErrorResponse)
    )
)]
pub async fn upload_recording(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Upload request is not multipart");
        Error::NoFile
    })?;

    let limit_bytes = state.limits.max_size_bytes;

    // Dropping this on any early return removes the temporary file
    let mut recording: Option<PendingRecording> = None;
    let mut room: Option<String> = None;
    let mut timestamp: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit_bytes))? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_some() {
            check_file_field(&field_name, recording.is_some())?;

            let mimetype = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();
            state.limits.check_mime_type(&mimetype)?;

            let mut pending = state.storage.begin(mimetype).await?;
            let mut gauge = state.limits.size_gauge();

            while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit_bytes))? {
                gauge.record(chunk.len())?;
                pending.write_chunk(&chunk).await?;
                trace!(received = gauge.received(), "Received recording chunk");
            }

            debug!(size = pending.size_bytes(), mimetype = %pending.mimetype(), "Recording part received");
            recording = Some(pending);
            continue;
        }

        match field_name.as_str() {
            ROOM_FIELD => room = Some(field.text().await.map_err(|e| multipart_error(e, limit_bytes))?),
            TIMESTAMP_FIELD => timestamp = Some(field.text().await.map_err(|e| multipart_error(e, limit_bytes))?),
            other => trace!(field = %other, "Ignoring form field"),
        }
    }

    let recording = recording.ok_or(Error::NoFile)?;
    let metadata = RecordingMetadata::resolve(room, timestamp, Utc::now());
    let stored = recording.commit(&metadata.filename()).await?;

    info!(
        filename = %stored.filename,
        size = stored.size_bytes,
        room = %metadata.room,
        "Recording stored"
    );

    Ok(Json(UploadResponse::new(stored, metadata)))
}
