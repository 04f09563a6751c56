// src/error.rs
// Standardized error types for UpgradeSage

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable, machine-readable failure kinds for one analysis run.
///
/// Every pipeline stage maps its failure to exactly one of these. The serialized
/// form (PascalCase) is part of the `error` event contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    RemoteUnreachable,
    RefNotFound,
    AuthenticationRejected,
    WorkspaceAllocationFailed,
    DiffComputationFailed,
    ModelUnavailable,
    ModelResponseInvalid,
    RequestMalformed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteUnreachable => "RemoteUnreachable",
            Self::RefNotFound => "RefNotFound",
            Self::AuthenticationRejected => "AuthenticationRejected",
            Self::WorkspaceAllocationFailed => "WorkspaceAllocationFailed",
            Self::DiffComputationFailed => "DiffComputationFailed",
            Self::ModelUnavailable => "ModelUnavailable",
            Self::ModelResponseInvalid => "ModelResponseInvalid",
            Self::RequestMalformed => "RequestMalformed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed analysis stage: one taxonomy kind plus a human-readable message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct AnalysisError {
    pub kind: FailureKind,
    pub message: String,
}

impl AnalysisError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn remote_unreachable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RemoteUnreachable, message)
    }

    pub fn ref_not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RefNotFound, message)
    }

    pub fn auth_rejected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::AuthenticationRejected, message)
    }

    pub fn workspace(message: impl Into<String>) -> Self {
        Self::new(FailureKind::WorkspaceAllocationFailed, message)
    }

    pub fn diff(message: impl Into<String>) -> Self {
        Self::new(FailureKind::DiffComputationFailed, message)
    }

    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ModelUnavailable, message)
    }

    pub fn model_invalid(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ModelResponseInvalid, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RequestMalformed, message)
    }
}

/// Main error type for the UpgradeSage library
#[derive(Error, Debug)]
pub enum SageError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("unknown error: {0}")]
    Other(String),
}

/// Convenience type alias for Result using SageError
pub type Result<T> = std::result::Result<T, SageError>;

impl From<String> for SageError {
    fn from(s: String) -> Self {
        SageError::Other(s)
    }
}
