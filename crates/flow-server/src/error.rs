//! Error types for the flow server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use process_designer::DesignerError;
use thiserror::Error;

/// Errors that stop the server from starting
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse server config: {0}")]
    Parse(serde_json::Error),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Designer config error: {0}")]
    DesignerConfig(#[from] process_designer::ConfigError),

    #[error("Flow store error: {0}")]
    Store(#[from] DesignerError),
}

/// Error returned by request handlers as `{"error": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DesignerError> for ApiError {
    fn from(error: DesignerError) -> Self {
        match error {
            DesignerError::FlowNotFound(_) => ApiError::NotFound("Process flow not found".into()),
            DesignerError::InvalidDocument(message) => ApiError::BadRequest(message),
            other => {
                log::error!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
