//! Error types for mqm-ui
//!
//! Every handler failure is rendered as
//! `{"error": {"code": ..., "message": ...}}` with a status code chosen from
//! the underlying session error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. sync not configured
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session core error
    #[error(transparent)]
    Session(#[from] mqm_common::Error),
}

impl ApiError {
    /// Status code and stable error code for this error
    pub fn classify(&self) -> (StatusCode, &'static str) {
        use mqm_common::Error as E;

        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            ApiError::Session(err) => match err {
                E::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                E::SpanNotFound { .. } => (StatusCode::BAD_REQUEST, "SPAN_NOT_FOUND"),
                E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                E::OutOfRange { .. } => (StatusCode::NOT_FOUND, "OUT_OF_RANGE"),
                E::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
                E::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                E::NoDataset => (StatusCode::CONFLICT, "NO_DATASET"),
                E::DataLoad(_) => (StatusCode::UNPROCESSABLE_ENTITY, "DATA_LOAD"),
                E::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE"),
                E::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                E::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.classify();
        let message = match &self {
            ApiError::Session(err) => err.to_string(),
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Io(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        } else {
            tracing::debug!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mqm_common::Error;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                Error::SpanNotFound { span: "x".into() },
                StatusCode::BAD_REQUEST,
            ),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                Error::OutOfRange { position: 3, len: 2 },
                StatusCode::NOT_FOUND,
            ),
            (Error::InvalidState("x".into()), StatusCode::CONFLICT),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
            (Error::NoDataset, StatusCode::CONFLICT),
            (Error::DataLoad("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                Error::Persistence("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = ApiError::from(err).classify();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_io_error_is_internal() {
        let err = ApiError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.classify(), (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"));
    }
}
