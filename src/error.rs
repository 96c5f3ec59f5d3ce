use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure of a single key-value store operation. The Redis detail is folded
/// into the message here so the in-memory test store can share the type.
#[derive(Error, Debug)]
#[error("store operation failed: {0}")]
pub struct StoreError(pub String);

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Internal Server Error")]
    Store(#[from] StoreError),

    #[error("Gone")]
    Gone,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Gone => StatusCode::GONE,
        };

        // Store detail stays in the server log; the caller only ever sees the
        // generic message from the Display impl above.
        if let AppError::Store(ref e) = self {
            error!("{e}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
