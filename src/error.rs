//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Missing form fields are never errors; only malformed input and
/// storage failures end up here.
#[derive(Error, Debug)]
pub enum AppError {
    /// The multipart body could not be read
    #[error("Invalid multipart request: {0}")]
    InvalidMultipart(String),

    /// The uploaded image exceeds the configured limit
    #[error("Upload too large: the limit is {limit} bytes")]
    PayloadTooLarge {
        /// Configured maximum
        limit: usize,
    },

    /// A lab value was found but could not be parsed as a number
    #[error("Invalid lab results: {0}")]
    LabParse(#[from] crate::diagnosis::LabParseError),

    /// The uploaded image could not be written to disk
    #[error("Storage error: {0}")]
    Storage(#[from] crate::services::uploads::StorageError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::LabParse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
