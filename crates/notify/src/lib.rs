// Notify crate clippy configuration
#![allow(clippy::field_reassign_with_default)] // Used for conditional struct field setting
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! payrelay notification pipeline
//!
//! Receives verified Stripe checkout events and fans each completed payment
//! out to the configured destinations.
//!
//! ## Features
//!
//! - **Webhook verification**: `Stripe-Signature` HMAC check with replay
//!   protection
//! - **Deduplication**: in-memory seen-set keyed by session id
//! - **Notifications**: Telegram (Bot API) and Slack (`chat.postMessage`)
//! - **Sheet log**: one row per payment in a Google Sheet, duplicate-safe
//! - **Attribution**: UTM/ad/geo metadata pulled from the Stripe Customer

pub mod channels;
pub mod client;
pub mod dedup;
pub mod error;
pub mod format;
pub mod payment;
pub mod retry;
pub mod sheets;
pub mod webhooks;


// Channels
pub use channels::{NotifyChannel, SlackChannel, SlackConfig, TelegramChannel, TelegramConfig};

// Client
pub use client::{StripeClient, StripeConfig};

// Dedup
pub use dedup::DedupSet;

// Error
pub use error::{NotifyError, NotifyResult};

// Payment
pub use payment::{Attribution, PaymentRecord, SHEET_COLUMNS};

// Retry
pub use retry::fetch_with_retry;

// Sheets
pub use sheets::{SheetsClient, SheetsConfig};

// Webhooks
pub use webhooks::{verify_signature, WebhookHandler, SIGNATURE_TOLERANCE_SECS};

use std::sync::Arc;

/// Main notification service assembled from environment configuration
pub struct NotifyService {
    pub webhooks: WebhookHandler,
    pub dedup: DedupSet,
}

impl NotifyService {
    /// Build the service from environment variables. Stripe credentials are
    /// required; each destination is optional and skipped with a warning
    /// when unconfigured.
    pub fn from_env() -> NotifyResult<Self> {
        let stripe = StripeClient::from_env()?;
        let dedup = DedupSet::new();

        let mut channels: Vec<Arc<dyn NotifyChannel>> = Vec::new();

        match TelegramConfig::from_env() {
            Some(config) => {
                tracing::info!("Telegram notifications enabled");
                channels.push(Arc::new(TelegramChannel::new(config)));
            }
            None => tracing::warn!(
                "Telegram not configured (missing TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID)"
            ),
        }

        match SlackConfig::from_env() {
            Some(config) => {
                tracing::info!("Slack notifications enabled");
                channels.push(Arc::new(SlackChannel::new(config)));
            }
            None => {
                tracing::warn!("Slack not configured (missing SLACK_BOT_TOKEN or SLACK_CHANNEL)")
            }
        }

        let sheets = match SheetsConfig::from_env() {
            Some(config) => {
                tracing::info!(spreadsheet_id = %config.spreadsheet_id, "Sheet log enabled");
                Some(SheetsClient::new(config))
            }
            None => {
                tracing::warn!(
                    "Sheet log not configured (missing GOOGLE_SERVICE_ACCOUNT_EMAIL, \
                     GOOGLE_PRIVATE_KEY or SHEET_ID)"
                );
                None
            }
        };

        if channels.is_empty() && sheets.is_none() {
            tracing::warn!("No notification destinations configured - events will only be logged");
        }

        Ok(Self {
            webhooks: WebhookHandler::new(stripe, dedup.clone(), channels, sheets),
            dedup,
        })
    }

    /// Assemble the service from explicit parts.
    pub fn new(
        stripe: StripeClient,
        channels: Vec<Arc<dyn NotifyChannel>>,
        sheets: Option<SheetsClient>,
    ) -> Self {
        let dedup = DedupSet::new();
        Self {
            webhooks: WebhookHandler::new(stripe, dedup.clone(), channels, sheets),
            dedup,
        }
    }
}
