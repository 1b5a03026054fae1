//! Application error types and handling.
//!
//! Every core operation returns an [`AppResult`]. The streaming endpoint turns
//! the same errors into structured JSON responses.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Empty or malformed input, invalid theme, unsupported extension,
    /// not-a-directory.
    #[error("{0}")]
    Validation(String),

    /// Missing playlist, file or directory.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate playlist name or use of a reserved name.
    #[error("{0}")]
    Conflict(String),

    /// Path resolves outside every configured music directory.
    #[error("{0}")]
    Containment(String),

    /// HTTP method not accepted by the endpoint.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Internal failure that is not a plain I/O error.
    #[error("{0}")]
    Internal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Containment(_) => "CONTAINMENT",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    pub fn path_required() -> Self {
        Self::Validation("path is required".to_string())
    }

    pub fn unsupported_audio() -> Self {
        Self::Validation("unsupported audio type".to_string())
    }

    pub fn playlist_name_required() -> Self {
        Self::Validation("playlist name is required".to_string())
    }

    pub fn playlist_not_found(name: &str) -> Self {
        Self::NotFound(format!("playlist not found: {}", name))
    }

    pub fn reserved_playlist() -> Self {
        Self::Conflict("playlist name is reserved".to_string())
    }

    /// Create a containment error for a file outside the music directories.
    pub fn outside_music_dirs() -> Self {
        Self::Containment("file not in music directory".to_string())
    }

    /// Map an I/O error, turning `NotFound` into [`AppError::NotFound`].
    pub fn from_io(err: std::io::Error, what: impl std::fmt::Display) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(format!("not found: {}", what))
        } else {
            Self::Io(err)
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Containment(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_response = ErrorResponse::new(self.error_code(), self.to_string());

        if status.is_server_error() {
            tracing::error!(
                error_code = %self.error_code(),
                status = %status.as_u16(),
                message = %self,
                "Stream request failed"
            );
        } else {
            tracing::debug!(
                error_code = %self.error_code(),
                status = %status.as_u16(),
                message = %self,
                "Stream request rejected"
            );
        }

        HttpResponse::build(status).json(error_response)
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for converting Option to AppResult.
pub trait OptionExt<T> {
    /// Convert None to NotFound error.
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}
