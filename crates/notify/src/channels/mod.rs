//! Outbound notification channels
//!
//! Each channel formats a payment into a platform-specific message and sends
//! it over HTTP. Channels are independent: one failing never blocks another.

pub mod slack;
pub mod telegram;

use async_trait::async_trait;

use crate::error::NotifyResult;
use crate::payment::PaymentRecord;

pub use slack::{SlackChannel, SlackConfig};
pub use telegram::{TelegramChannel, TelegramConfig};

/// A destination for payment notifications
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Deliver one payment notification.
    async fn send(&self, record: &PaymentRecord) -> NotifyResult<()>;
}
