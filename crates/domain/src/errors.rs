//! Stable error taxonomy shared by the engine, storage, and API layers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Domain-level errors, independent of transport.
///
/// `Degraded` and `Transient` never reach the API boundary as errors: the
/// coordinator folds `Transient` into a `degraded` flag on its response
/// (spec §7), so only `NotFound`, `InvalidRequest`, `Conflict`, and `Fatal`
/// ever become HTTP error responses.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid request")]
    InvalidRequestMulti(Vec<String>),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Non-fatal degradation of a recommendation result. Carried as a flag,
    /// never surfaced as an HTTP error; kept here so internal code can use
    /// the same `Result<_, DomainError>` plumbing everywhere.
    #[error("degraded: {0}")]
    Degraded(String),

    /// Recoverable within a retry budget; callers should recover locally
    /// and never let this escape to a response.
    #[error("transient: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl DomainError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidRequest(_) | DomainError::InvalidRequestMulti(_) => {
                StatusCode::BAD_REQUEST
            }
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Degraded(_) | DomainError::Transient(_) => StatusCode::OK,
            DomainError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "NotFound",
            DomainError::InvalidRequest(_) | DomainError::InvalidRequestMulti(_) => {
                "InvalidRequest"
            }
            DomainError::Conflict(_) => "Conflict",
            DomainError::Degraded(_) => "Degraded",
            DomainError::Transient(_) => "Transient",
            DomainError::Fatal(_) => "Fatal",
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if matches!(self, DomainError::Fatal(_)) {
            tracing::error!("fatal error: {}", self);
        }

        let body = match &self {
            DomainError::InvalidRequestMulti(details) => ErrorResponse {
                code: self.code(),
                error: "validation failed".to_string(),
                details: Some(details.clone()),
            },
            _ => ErrorResponse {
                code: self.code(),
                error: self.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("row not found".to_string()),
            other => DomainError::Fatal(other.to_string()),
        }
    }
}
