use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Detail returned to callers whenever the chat model cannot produce a reply.
pub const BACKEND_UNAVAILABLE: &str = "AI backend unavailable";

const GENERIC_FAILURE: &str = "An unexpected error occurred";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("AI backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Text placed in the `detail` field of the error body.
    ///
    /// Client errors are echoed verbatim; every server-side failure collapses to a
    /// fixed message so upstream error text never reaches the caller.
    pub fn public_detail(&self) -> String {
        match self {
            ApiError::InvalidInput(message) => message.clone(),
            ApiError::BackendUnavailable(_) => BACKEND_UNAVAILABLE.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            detail: self.public_detail(),
            status: status.as_u16(),
        })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::ExternalServiceError(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
