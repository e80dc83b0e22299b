//! Service- and HTTP-level error types.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    scoring::{MAX_ROUND_POINTS, ScoreRuleError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Referenced game or round does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Point value outside the allowed range.
    #[error("points must be between 0 and {max}, got {points}")]
    OutOfRange {
        /// The rejected value.
        points: u8,
        /// Upper bound of the allowed range.
        max: u8,
    },
    /// Tag exceeds the allowed length after trimming.
    #[error("tag must be {max} characters or fewer, got {length}")]
    TagTooLong {
        /// Character count of the rejected tag.
        length: usize,
        /// Maximum allowed character count.
        max: usize,
    },
    /// Operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A complete round violates the one-zero-winner rule at close time.
    #[error("invalid round result: {0}")]
    InvalidRoundResult(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ScoreRuleError> for ServiceError {
    fn from(err: ScoreRuleError) -> Self {
        match err {
            ScoreRuleError::OutOfRange { points, .. } => ServiceError::OutOfRange {
                points,
                max: MAX_ROUND_POINTS,
            },
            ScoreRuleError::NotOneWinner { .. } => {
                ServiceError::InvalidRoundResult(err.to_string())
            }
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidArgument(message) => AppError::BadRequest(message),
            err @ ServiceError::OutOfRange { .. } => AppError::BadRequest(err.to_string()),
            err @ ServiceError::TagTooLong { .. } => AppError::BadRequest(err.to_string()),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            err @ ServiceError::InvalidRoundResult(_) => AppError::Conflict(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
