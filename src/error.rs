//! API error type shared by the store, the handlers and the HTTP service.
//!
//! Every failure that reaches a client is an [`ApiError`]. Its status code
//! decides the HTTP status line and its message becomes the `error` field of
//! the JSON body (or the text of the HTML error page).

use rusqlite::ErrorCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors surfaced to HTTP clients
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("{0}")]
    NotAcceptable(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    ServerError(String),
    #[error("{0}")]
    NotImplemented(String),
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// HTTP status code for this error
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed(_) => 405,
            ApiError::NotAcceptable(_) => 406,
            ApiError::Conflict(_) => 409,
            ApiError::UnsupportedMediaType(_) => 415,
            ApiError::ServerError(_) => 500,
            ApiError::NotImplemented(_) => 501,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// JSON body sent for this error: `{"error": "<message>"}`
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({ "error": self.to_string() })
    }

    pub fn not_found() -> Self {
        ApiError::NotFound("Resource not found".to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _) => match code.code {
                ErrorCode::ConstraintViolation => ApiError::Conflict(err.to_string()),
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    ApiError::ServiceUnavailable(err.to_string())
                }
                ErrorCode::ReadOnly => ApiError::Forbidden(err.to_string()),
                _ => ApiError::ServerError(err.to_string()),
            },
            _ => ApiError::ServerError(err.to_string()),
        }
    }
}
