//! Stripe webhook verification and fan-out
//!
//! Verifies the `Stripe-Signature` header against the webhook secret, parses
//! the event, deduplicates by session id, and fans the payment out to the
//! configured channels and the sheet log. Channel and sheet failures are
//! logged but never fail the delivery: Stripe would otherwise redeliver and
//! re-notify every healthy channel.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use stripe::{
    CheckoutSession, CheckoutSessionPaymentStatus, Customer, Event, EventObject, EventType,
    Expandable,
};
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::channels::NotifyChannel;
use crate::client::StripeClient;
use crate::dedup::DedupSet;
use crate::error::{NotifyError, NotifyResult};
use crate::payment::PaymentRecord;
use crate::sheets::SheetsClient;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed age of a signed payload (replay protection)
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix ts>,v1=<hex hmac>`; the signed payload is
/// `"{t}.{body}"` keyed with the webhook secret (minus its `whsec_` prefix).
pub fn verify_signature(payload: &str, signature_header: &str, secret: &str) -> NotifyResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut v1_signature: Option<&str> = None;

    for part in signature_header.split(',') {
        match part.splitn(2, '=').collect::<Vec<_>>()[..] {
            ["t", value] => timestamp = value.parse().ok(),
            ["v1", value] => v1_signature = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(NotifyError::WebhookSignatureInvalid)?;
    let v1_signature = v1_signature.ok_or(NotifyError::WebhookSignatureInvalid)?;

    let now = OffsetDateTime::now_utc().unix_timestamp();
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(
            timestamp = timestamp,
            age_secs = (now - timestamp).abs(),
            "Webhook timestamp outside tolerance"
        );
        return Err(NotifyError::WebhookSignatureInvalid);
    }

    let secret_key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let signed_payload = format!("{}.{}", timestamp, payload);

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|_| NotifyError::WebhookSignatureInvalid)?;
    mac.update(signed_payload.as_bytes());
    let expected = mac.finalize().into_bytes();

    let received = hex::decode(v1_signature).map_err(|_| NotifyError::WebhookSignatureInvalid)?;

    if expected.as_slice().ct_eq(received.as_slice()).into() {
        Ok(())
    } else {
        Err(NotifyError::WebhookSignatureInvalid)
    }
}

/// Webhook handler: verification, dedup, and notification fan-out
pub struct WebhookHandler {
    stripe: StripeClient,
    dedup: DedupSet,
    channels: Vec<Arc<dyn NotifyChannel>>,
    sheets: Option<SheetsClient>,
}

impl WebhookHandler {
    pub fn new(
        stripe: StripeClient,
        dedup: DedupSet,
        channels: Vec<Arc<dyn NotifyChannel>>,
        sheets: Option<SheetsClient>,
    ) -> Self {
        Self {
            stripe,
            dedup,
            channels,
            sheets,
        }
    }

    /// Verify the signature and parse the raw body into a Stripe event.
    pub fn verify_event(&self, payload: &str, signature_header: &str) -> NotifyResult<Event> {
        verify_signature(
            payload,
            signature_header,
            &self.stripe.config().webhook_secret,
        )?;

        let event: Event = serde_json::from_str(payload).map_err(|e| {
            tracing::error!(parse_error = %e, "Failed to parse webhook event JSON");
            NotifyError::WebhookSignatureInvalid
        })?;

        Ok(event)
    }

    /// Handle a verified Stripe event.
    pub async fn handle_event(&self, event: Event) -> NotifyResult<()> {
        match event.type_ {
            EventType::CheckoutSessionCompleted
            | EventType::CheckoutSessionAsyncPaymentSucceeded => {
                let session = match event.data.object {
                    EventObject::CheckoutSession(session) => session,
                    _ => {
                        return Err(NotifyError::WebhookEventNotSupported(
                            "Expected CheckoutSession".to_string(),
                        ))
                    }
                };

                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.type_,
                    session_id = %session.id,
                    "Processing checkout event"
                );
                self.handle_checkout_completed(session).await
            }
            _ => {
                // Track which events arrive without a handler; useful when
                // the Stripe endpoint subscription is broader than needed
                tracing::info!(
                    event_type = %event.type_,
                    event_id = %event.id,
                    "Received unhandled Stripe event type - acknowledging"
                );
                Ok(())
            }
        }
    }

    /// Notify all channels and log the payment for one completed session.
    pub async fn handle_checkout_completed(&self, session: CheckoutSession) -> NotifyResult<()> {
        let session_id = session.id.to_string();

        if session.payment_status == CheckoutSessionPaymentStatus::Unpaid {
            tracing::info!(
                session_id = %session_id,
                "Checkout session completed but unpaid, skipping"
            );
            return Ok(());
        }

        // Claim before processing: a concurrent redelivery must not produce
        // a second notification.
        if !self.dedup.claim(&session_id) {
            tracing::info!(
                session_id = %session_id,
                "Duplicate checkout session, already handled"
            );
            return Ok(());
        }

        let customer = self.resolve_customer(&session).await;
        let record = PaymentRecord::from_session(&session, customer.as_ref());

        tracing::info!(
            session_id = %record.session_id,
            amount = %record.amount_display(),
            email = record.customer_email.as_deref().unwrap_or(""),
            "Handling completed payment"
        );

        for channel in &self.channels {
            if let Err(e) = channel.send(&record).await {
                tracing::error!(
                    channel = channel.name(),
                    session_id = %record.session_id,
                    error = %e,
                    "Notification channel failed"
                );
            }
        }

        if let Some(sheets) = &self.sheets {
            if let Err(e) = sheets.append_payment(&record).await {
                tracing::error!(
                    session_id = %record.session_id,
                    error = %e,
                    "Failed to append payment to sheet"
                );
            }
        }

        Ok(())
    }

    /// Fetch the Customer for attribution metadata. Best-effort: the
    /// notification goes out without attribution when the read fails.
    async fn resolve_customer(&self, session: &CheckoutSession) -> Option<Customer> {
        match &session.customer {
            Some(Expandable::Object(customer)) => Some((**customer).clone()),
            Some(Expandable::Id(id)) => match self.stripe.fetch_customer(id).await {
                Ok(customer) => Some(customer),
                Err(e) => {
                    tracing::warn!(
                        customer_id = %id,
                        error = %e,
                        "Failed to fetch customer, notifying without attribution"
                    );
                    None
                }
            },
            None => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::client::StripeConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const TEST_SECRET: &str = "whsec_test123secret456";

    fn compute_signature(payload: &str, secret: &str, timestamp: i64) -> String {
        let secret_key = secret.strip_prefix("whsec_").unwrap_or(secret);
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signature_header(payload: &str, secret: &str, timestamp: i64) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            compute_signature(payload, secret, timestamp)
        )
    }

    fn now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let header = signature_header(payload, TEST_SECRET, now());
        assert!(verify_signature(payload, &header, TEST_SECRET).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let header = signature_header(payload, "whsec_other_secret", now());
        assert!(verify_signature(payload, &header, TEST_SECRET).is_err());
    }

    #[test]
    fn modified_payload_is_rejected() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let header = signature_header(payload, TEST_SECRET, now());
        let tampered = r#"{"type":"checkout.session.completed","amount":0}"#;
        assert!(verify_signature(tampered, &header, TEST_SECRET).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        // 10 minutes old, beyond the 5 minute tolerance
        let header = signature_header(payload, TEST_SECRET, now() - 600);
        assert!(verify_signature(payload, &header, TEST_SECRET).is_err());
    }

    #[test]
    fn missing_header_parts_are_rejected() {
        let payload = r#"{}"#;
        assert!(verify_signature(payload, "t=1234567890", TEST_SECRET).is_err());
        assert!(verify_signature(payload, "v1=deadbeef", TEST_SECRET).is_err());
        assert!(verify_signature(payload, "garbage", TEST_SECRET).is_err());
        assert!(verify_signature(payload, "", TEST_SECRET).is_err());
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        let payload = r#"{}"#;
        let header = format!("t={},v1=not-hex!", now());
        assert!(verify_signature(payload, &header, TEST_SECRET).is_err());
    }

    struct RecordingChannel {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingChannel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent_ids(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, record: &PaymentRecord) -> NotifyResult<()> {
            self.sent.lock().unwrap().push(record.session_id.clone());
            Ok(())
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl NotifyChannel for FailingChannel {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn send(&self, _record: &PaymentRecord) -> NotifyResult<()> {
            Err(NotifyError::ChannelFailed("boom".to_string()))
        }
    }

    fn handler(channels: Vec<Arc<dyn NotifyChannel>>) -> WebhookHandler {
        let stripe = StripeClient::new(StripeConfig {
            secret_key: "sk_test_xxx".to_string(),
            webhook_secret: TEST_SECRET.to_string(),
        });
        WebhookHandler::new(stripe, DedupSet::new(), channels, None)
    }

    fn paid_session(id: &str) -> CheckoutSession {
        let mut session = CheckoutSession::default();
        session.id = id.parse().unwrap();
        session.amount_total = Some(4900);
        session.currency = Some(stripe::Currency::USD);
        session.payment_status = CheckoutSessionPaymentStatus::Paid;
        session
    }

    #[tokio::test]
    async fn completed_session_notifies_channels() {
        let channel = RecordingChannel::new();
        let h = handler(vec![channel.clone()]);

        h.handle_checkout_completed(paid_session("cs_test_one"))
            .await
            .unwrap();

        assert_eq!(channel.sent_ids(), vec!["cs_test_one"]);
    }

    #[tokio::test]
    async fn duplicate_session_notifies_once() {
        let channel = RecordingChannel::new();
        let h = handler(vec![channel.clone()]);

        h.handle_checkout_completed(paid_session("cs_test_dup"))
            .await
            .unwrap();
        h.handle_checkout_completed(paid_session("cs_test_dup"))
            .await
            .unwrap();

        assert_eq!(channel.sent_ids(), vec!["cs_test_dup"]);
    }

    #[tokio::test]
    async fn unpaid_session_is_skipped() {
        let channel = RecordingChannel::new();
        let h = handler(vec![channel.clone()]);

        let mut session = paid_session("cs_test_unpaid");
        session.payment_status = CheckoutSessionPaymentStatus::Unpaid;
        h.handle_checkout_completed(session).await.unwrap();

        assert!(channel.sent_ids().is_empty());
    }

    #[tokio::test]
    async fn channel_failure_does_not_fail_handler_or_block_others() {
        let channel = RecordingChannel::new();
        let h = handler(vec![Arc::new(FailingChannel), channel.clone()]);

        h.handle_checkout_completed(paid_session("cs_test_mix"))
            .await
            .unwrap();

        // The failing channel is logged and skipped; the healthy one delivers
        assert_eq!(channel.sent_ids(), vec!["cs_test_mix"]);
    }

    #[test]
    fn verify_event_rejects_unparseable_payload() {
        let h = handler(vec![]);
        let payload = "not json at all";
        let header = signature_header(payload, TEST_SECRET, now());

        let err = h.verify_event(payload, &header).unwrap_err();
        assert!(matches!(err, NotifyError::WebhookSignatureInvalid));
    }

    #[test]
    fn verify_event_rejects_bad_signature_before_parsing() {
        let h = handler(vec![]);
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = format!("t={},v1=deadbeef", now());

        let err = h.verify_event(payload, &header).unwrap_err();
        assert!(matches!(err, NotifyError::WebhookSignatureInvalid));
    }
}
