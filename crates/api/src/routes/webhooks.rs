//! Stripe webhook endpoint
//!
//! Receives the raw body (signature verification needs the exact bytes
//! Stripe signed, never a re-serialized parse). Signature failures return
//! 400 so misconfigured endpoints surface quickly; processing failures
//! return 500 and rely on Stripe's own redelivery.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingHeader("Stripe-Signature"))?;

    let payload = std::str::from_utf8(&body).map_err(|_| ApiError::InvalidSignature)?;

    let event = state.notify.webhooks.verify_event(payload, signature)?;
    state.notify.webhooks.handle_event(event).await?;

    Ok(StatusCode::OK)
}
