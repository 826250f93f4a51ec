use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these, never on
// the human-readable message string.

/// Stable error code constants.
///
/// Clients should match on `code` from `{"code": "NOT_FOUND", "message": "..."}`.
/// Codes never change; messages may be reworded.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const NOT_FOUND_OR_UNAUTHORIZED: &str = "NOT_FOUND_OR_UNAUTHORIZED";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const ENCODING_FAILED: &str = "ENCODING_FAILED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Closed set of failures every layer reports.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"code": "NOT_FOUND", "message": "box 'abc' not found"}
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Input is malformed or exceeds a size limit. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid bearer token. HTTP 401.
    #[error("{0}")]
    Unauthenticated(String),

    /// The record exists but the caller does not own it. HTTP 403.
    #[error("{0}")]
    Unauthorized(String),

    /// No record for the given id. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// An owner-scoped write matched nothing: the record is missing or
    /// belongs to someone else, and the two are not told apart.
    /// HTTP 404.
    #[error("{0}")]
    NotFoundOrUnauthorized(String),

    /// Duplicate key on insert. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// A QR payload could not be encoded into a symbol. HTTP 500.
    #[error("{0}")]
    Encoding(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::Unauthenticated(_) => error_code::UNAUTHENTICATED,
            ServiceError::Unauthorized(_) => error_code::PERMISSION_DENIED,
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::NotFoundOrUnauthorized(_) => error_code::NOT_FOUND_OR_UNAUTHORIZED,
            ServiceError::Conflict(_) => error_code::ALREADY_EXISTS,
            ServiceError::Encoding(_) => error_code::ENCODING_FAILED,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::NotFoundOrUnauthorized(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fold "missing" and "not yours" into one outcome.
    ///
    /// Applied on owner-scoped paths so a non-owner learns nothing about
    /// whether an id exists. The message is fixed, so it carries no id
    /// either. Other variants pass through untouched.
    pub fn conceal_existence(self) -> Self {
        match self {
            ServiceError::NotFound(_)
            | ServiceError::Unauthorized(_)
            | ServiceError::NotFoundOrUnauthorized(_) => {
                ServiceError::NotFoundOrUnauthorized("box not found or unauthorized".into())
            }
            other => other,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
