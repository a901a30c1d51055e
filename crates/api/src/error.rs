//! API error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use payrelay_notify::NotifyError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<NotifyError> for ApiError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::WebhookSignatureInvalid => ApiError::InvalidSignature,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidSignature => {
                (StatusCode::BAD_REQUEST, "Invalid webhook signature")
            }
            ApiError::MissingHeader(_) => (StatusCode::BAD_REQUEST, "Missing required header"),
            ApiError::Internal(detail) => {
                // Processing failures are logged with detail; the response
                // stays generic so Stripe retries without leaking internals
                tracing::error!(error = %detail, "Webhook processing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
