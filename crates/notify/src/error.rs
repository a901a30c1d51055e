//! Error types for the notification pipeline

use thiserror::Error;

/// Errors produced while verifying, deduplicating, or fanning out a payment
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook signature verification failed")]
    WebhookSignatureInvalid,

    #[error("Webhook event not supported: {0}")]
    WebhookEventNotSupported(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Stripe API error: {0}")]
    Stripe(#[from] stripe::StripeError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel delivery failed: {0}")]
    ChannelFailed(String),

    #[error("Google Sheets error: {0}")]
    Sheets(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
