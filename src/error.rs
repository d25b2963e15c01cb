//! API error taxonomy and its JSON rendering

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown chapter id
    #[error("Unknown chapter: {0}")]
    NotFound(String),

    /// Non-success status or transport failure from the source host
    #[error("Upstream fetch failed: {0}")]
    Upstream(String),

    /// Auxiliary reference name failed the safe-filename check
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Unexpected server error: {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Unexpected(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Unexpected(_) => tracing::error!(error = %self, "request failed"),
            _ => tracing::warn!(error = %self, "request rejected"),
        }
        let payload = json!({ "error": self.to_string() });
        (self.status(), Json(payload)).into_response()
    }
}
