use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Missing or wrong bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Request `Origin` is not on the allow-list
    #[error("Origin {origin} is not allowed by CORS")]
    CorsRejected { origin: String },

    /// Multipart body carried no `file` part
    #[error("No file")]
    NoFile,

    /// Declared content-type of the file part is not accepted
    #[error("Invalid mimetype: {mimetype}")]
    InvalidMimeType { mimetype: String },

    /// File part under a field other than `file`, or more than one file part
    #[error("Unexpected field: {field}")]
    UnexpectedField { field: String },

    /// File part grew past the configured maximum
    #[error("File too large (limit is {limit_bytes} bytes)")]
    PayloadTooLarge { limit_bytes: u64 },

    /// Invalid request data, e.g. a malformed multipart body
    #[error("{message}")]
    BadRequest { message: String },

    /// Filesystem failure while persisting an upload
    #[error(transparent)]
    Storage(#[from] std::io::Error),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

/// JSON body returned for every application-level error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::CorsRejected { .. } => StatusCode::FORBIDDEN,
            Error::NoFile | Error::InvalidMimeType { .. } | Error::UnexpectedField { .. } | Error::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Storage(_) | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body.
    /// Storage failures carry the underlying I/O message.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthorized => "Unauthorized".to_string(),
            Error::CorsRejected { .. } => "Not allowed by CORS".to_string(),
            Error::NoFile => "No file".to_string(),
            Error::InvalidMimeType { .. } => "Invalid mimetype".to_string(),
            Error::UnexpectedField { .. } => "Unexpected field".to_string(),
            Error::PayloadTooLarge { .. } => "File too large".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::Storage(e) => e.to_string(),
            Error::Internal { .. } => self.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Storage(_) | Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unauthorized | Error::CorsRejected { .. } => {
                tracing::info!("Access rejected: {}", self);
            }
            Error::PayloadTooLarge { .. } | Error::InvalidMimeType { .. } => {
                tracing::warn!("Upload rejected: {}", self);
            }
            Error::NoFile | Error::UnexpectedField { .. } | Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match self {
            // A CORS block is a protocol-level refusal, the browser never sees a body
            Error::CorsRejected { .. } => status.into_response(),
            _ => {
                let body = ErrorResponse { error: self.user_message() };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
