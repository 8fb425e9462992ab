use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::upload::{RecordingMetadata, StoredFile};

/// Metadata of a stored recording
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoredFileResponse {
    /// Derived filename, e.g. `recording_room_1_2024-01-01T00-00-00.000Z.webm`
    pub filename: String,
    /// Absolute path on the server
    pub path: String,
    /// Bytes written
    pub size: u64,
    /// Content-type declared by the client
    pub mimetype: String,
}

impl From<StoredFile> for StoredFileResponse {
    fn from(file: StoredFile) -> Self {
        Self {
            filename: file.filename,
            path: file.path.to_string_lossy().into_owned(),
            size: file.size_bytes,
            mimetype: file.mimetype,
        }
    }
}

/// Successful upload response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub ok: bool,
    pub file: StoredFileResponse,
    /// Room as sent by the client (unsanitized), or `call`
    pub room: String,
    /// Timestamp as sent by the client (unsanitized), or the server time of the upload
    pub timestamp: String,
}

impl UploadResponse {
    pub fn new(file: StoredFile, metadata: RecordingMetadata) -> Self {
        Self {
            ok: true,
            file: file.into(),
            room: metadata.room,
            timestamp: metadata.timestamp,
        }
    }
}
