use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the model runtime. Raw transport errors never leave
/// the provider layer; they are classified into one of these kinds.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("inference backend unreachable: {0}")]
    Unavailable(String),
    #[error("inference call timed out")]
    Timeout,
    #[error("malformed inference response: {0}")]
    Malformed(String),
}

/// Failures surfaced by the chat pipeline entry point.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error(transparent)]
    Inference(#[from] LlmError),
}

/// Failures from the chunk index storage layer.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Startup failures. Per-request failures degrade or map to user-safe
/// messages; these are fatal before the server binds.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("chunk index error: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("gateway timeout")]
    GatewayTimeout,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyQuestion => {
                ApiError::BadRequest("prompt must not be empty".to_string())
            }
            ChatError::Inference(LlmError::Timeout) => ApiError::GatewayTimeout,
            ChatError::Inference(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Forbidden: invalid API token".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::GatewayTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Response timeout from model backend".to_string(),
            ),
            ApiError::Internal(detail) => {
                // Detail goes to the log only, never the response body.
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
