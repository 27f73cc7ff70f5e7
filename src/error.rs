use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::notify::NotifyError;
use crate::store::StoreError;

/// Request-level error taxonomy. Everything a handler can fail with maps
/// onto one of these variants; the `IntoResponse` impl below is the single
/// place where status codes and response bodies are decided.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(String),

    /// A multi-step write batch failed partway. The store has no
    /// transactions, so writes applied before the failure stay applied.
    #[error("{context}: {detail}")]
    Partial {
        context: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upstream(#[from] NotifyError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn partial(context: &'static str, detail: impl ToString) -> Self {
        ApiError::Partial {
            context,
            detail: detail.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal detail is logged, never returned to the caller.
        let (status, body) = match &self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, json!({"error": message})),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({"message": message})),
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({"message": message}))
            }
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, json!({"error": message})),
            ApiError::Partial { context, detail } => {
                tracing::error!("partial failure in {context}: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "partial failure; earlier writes were not rolled back"}),
                )
            }
            ApiError::Store(err) => {
                tracing::error!("store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "internal server error"}),
                )
            }
            ApiError::Upstream(err) => {
                tracing::error!("upstream delivery error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({"error": "upstream delivery failed"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
