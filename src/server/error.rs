use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::admin_auth::AuthError;
use crate::race_store::{PipelineError, RaceKeyError};

pub const DATABASE_URL_NOT_SET: &str = "DATABASE_URL not set";

/// Errors surfaced by the HTTP handlers. Each maps to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Configuration(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Data source failed: {0}")]
    DataSource(String),

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    NotFound(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DataSource(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn database_unset() -> Self {
        ApiError::Configuration(DATABASE_URL_NOT_SET.to_string())
    }

    /// Label used for the ingest outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::Configuration(_) => "configuration_error",
            ApiError::Forbidden => "forbidden",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::InvalidPayload(_) => "invalid_payload",
            ApiError::DataSource(_) => "source_error",
            ApiError::Persistence(_) => "persistence_error",
            ApiError::NotFound(_) => "not_found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unconfigured => ApiError::Configuration(err.to_string()),
            AuthError::Forbidden => ApiError::Forbidden,
        }
    }
}

impl From<RaceKeyError> for ApiError {
    fn from(err: RaceKeyError) -> Self {
        ApiError::InvalidRequest(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidPayload(e) => ApiError::InvalidPayload(e.to_string()),
            other => ApiError::Persistence(other.to_string()),
        }
    }
}
