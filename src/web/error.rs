// src/web/error.rs
// HTTP error responses: status code plus a `{"detail": ...}` body

use crate::error::{AnalysisError, FailureKind, SageError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Error returned before any stream is opened
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    /// Taxonomy kind, when the error came from the pipeline
    pub kind: Option<FailureKind>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            kind: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
            kind: None,
        }
    }

    /// Request body that parsed but is missing or has unusable fields
    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::UNPROCESSABLE_ENTITY,
            kind: Some(FailureKind::RequestMalformed),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            error!(status = %self.status_code, "API error: {}", self.message);
        }

        let body = match self.kind {
            Some(kind) => json!({ "detail": self.message, "kind": kind }),
            None => json!({ "detail": self.message }),
        };
        (self.status_code, Json(body)).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        let status_code = match e.kind {
            FailureKind::RequestMalformed => StatusCode::UNPROCESSABLE_ENTITY,
            FailureKind::RefNotFound => StatusCode::NOT_FOUND,
            FailureKind::AuthenticationRejected => StatusCode::UNAUTHORIZED,
            FailureKind::RemoteUnreachable
            | FailureKind::ModelUnavailable
            | FailureKind::ModelResponseInvalid => StatusCode::BAD_GATEWAY,
            FailureKind::WorkspaceAllocationFailed | FailureKind::DiffComputationFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            message: e.message,
            status_code,
            kind: Some(e.kind),
        }
    }
}

impl From<SageError> for ApiError {
    fn from(e: SageError) -> Self {
        match e {
            SageError::Analysis(inner) => inner.into(),
            SageError::Config(msg) => Self::bad_request(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

/// Result type for handlers that return ApiError
pub type ApiResult<T> = Result<T, ApiError>;
