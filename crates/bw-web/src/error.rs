//! Error types for bw-web

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use bw_extra::ProvisionError;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Invalid callback payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Provision(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::Body(_) | WebError::Json(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// Provider details stay in the logs, never in the response body
impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = match self {
            WebError::Provision(_) => "Bandwidth provisioning failed",
            WebError::Body(_) | WebError::Json(_) => "Invalid request body",
        };
        (self.status(), body).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WebError>;
