//! Application error types with HTTP status code mapping.
//!
//! [`AppError`] is the central error type for the API. Each variant maps to
//! a specific HTTP status code and to the failure envelope every endpoint
//! shares.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ImportType, UndoRejection};
use crate::store::StoreError;

/// Failure envelope returned by every endpoint.
///
/// ```json
/// {
///   "success": false,
///   "error": "Event not found",
///   "code": 2001,
///   "timestamp": "2024-05-01T12:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable error message.
    pub error: String,
    /// Numeric error code (see [`AppError::error_code`]).
    pub code: u32,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                        |
/// |-----------|-----------------|------------------------------------|
/// | 1000–1099 | Validation      | 400 Bad Request                    |
/// | 1100–1199 | Access          | 401 Unauthorized / 403 Forbidden   |
/// | 2000–2999 | State/Not Found | 403 / 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error          |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request validation failed.
    #[error("{0}")]
    InvalidRequest(String),

    /// An import operation was called on a session of the other type.
    #[error("import session is a {actual} import, not {expected}")]
    ImportTypeMismatch {
        /// Type the operation handles.
        expected: ImportType,
        /// Type of the stored session.
        actual: ImportType,
    },

    /// Missing, malformed or expired credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// An import session is past its revert window.
    #[error("Cannot delete imports older than 30 days")]
    ImportTooOld,

    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request collides with existing state.
    #[error("{0}")]
    Conflict(String),

    /// An undo request was refused.
    #[error("no undo available: {0}")]
    UndoUnavailable(#[from] UndoRejection),

    /// Store failure, carrying the backend message.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a [`AppError::NotFound`] naming a resource.
    #[must_use]
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{resource} not found"))
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ImportTypeMismatch { .. } => 1002,
            Self::Unauthorized(_) => 1101,
            Self::Forbidden(_) => 1102,
            Self::NotFound(_) => 2001,
            Self::Conflict(_) => 2002,
            Self::ImportTooOld => 2003,
            Self::UndoUnavailable(_) => 2004,
            Self::Store(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::ImportTypeMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::ImportTooOld => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::UndoUnavailable(_) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.error_code(),
            timestamp: Utc::now().to_rfc3339(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_rejection_maps_to_conflict_with_reason() {
        let err = AppError::from(UndoRejection::AlreadyUsed);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "no undo available: backup was already used");
    }

    #[test]
    fn import_too_old_is_forbidden() {
        let err = AppError::ImportTooOld;
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.to_string().contains("30 days"));
    }

    #[test]
    fn store_errors_are_server_errors_carrying_message() {
        let err = AppError::from(StoreError::Backend("connection reset".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn not_found_names_resource() {
        let err = AppError::not_found("Event");
        assert_eq!(err.to_string(), "Event not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
