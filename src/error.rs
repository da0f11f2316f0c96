use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::io;

use crate::http::ServerError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Access denied")]
    AccessDenied,

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::AccessDenied => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            _ => {
                tracing::error!("Internal error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
