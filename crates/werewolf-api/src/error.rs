//! Werewolf HTTP host: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use werewolf_core::error::GameError;

/// Startup and runtime errors for the HTTP host.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `GameError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code for the wrapped error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::State(_) => StatusCode::CONFLICT,
            GameError::Capacity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GameError::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
