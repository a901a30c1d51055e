//! Payment record built from a completed Checkout Session
//!
//! This is the one entity the service deals in: a flattened view of a Stripe
//! Checkout Session plus the marketing attribution and geo metadata carried
//! on the Customer. It exists only for the lifetime of a webhook delivery;
//! the durable copy is the spreadsheet row.

use std::collections::HashMap;

use stripe::{CheckoutSession, CheckoutSessionPaymentStatus, Customer, Expandable};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Marketing attribution and geo fields from Stripe metadata
///
/// All fields are free-form key/value metadata and may be absent. Customer
/// metadata provides the base; session metadata overrides on collision since
/// it is per-purchase rather than account-wide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub ad_name: Option<String>,
    pub campaign_name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl Attribution {
    /// Build from one metadata map.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Self {
        let get = |key: &str| metadata.get(key).filter(|v| !v.is_empty()).cloned();

        Self {
            utm_source: get("utm_source"),
            utm_medium: get("utm_medium"),
            utm_campaign: get("utm_campaign"),
            ad_name: get("ad_name"),
            campaign_name: get("campaign_name"),
            country: get("country"),
            city: get("city"),
        }
    }

    /// Overlay `other` on top of `self`, keeping existing values where
    /// `other` has none.
    pub fn merged_with(self, other: Attribution) -> Self {
        Self {
            utm_source: other.utm_source.or(self.utm_source),
            utm_medium: other.utm_medium.or(self.utm_medium),
            utm_campaign: other.utm_campaign.or(self.utm_campaign),
            ad_name: other.ad_name.or(self.ad_name),
            campaign_name: other.campaign_name.or(self.campaign_name),
            country: other.country.or(self.country),
            city: other.city.or(self.city),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.utm_source.is_none()
            && self.utm_medium.is_none()
            && self.utm_campaign.is_none()
            && self.ad_name.is_none()
            && self.campaign_name.is_none()
            && self.country.is_none()
            && self.city.is_none()
    }
}

/// Flattened purchase record for notification and logging
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub session_id: String,
    pub amount_cents: i64,
    /// Uppercase ISO currency code
    pub currency: String,
    pub status: &'static str,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    /// When this delivery was processed, not when Stripe created the session
    pub received_at: OffsetDateTime,
    pub attribution: Attribution,
}

impl PaymentRecord {
    /// Build a record from a checkout session and, when available, the
    /// Customer object carrying attribution metadata.
    pub fn from_session(session: &CheckoutSession, customer: Option<&Customer>) -> Self {
        let customer_id = session.customer.as_ref().map(|c| match c {
            Expandable::Id(id) => id.to_string(),
            Expandable::Object(customer) => customer.id.to_string(),
        });

        let customer_email = session
            .customer_details
            .as_ref()
            .and_then(|d| d.email.clone())
            .or_else(|| customer.and_then(|c| c.email.clone()));

        let mut attribution = customer
            .and_then(|c| c.metadata.as_ref())
            .map(Attribution::from_metadata)
            .unwrap_or_default();
        if let Some(metadata) = &session.metadata {
            attribution = attribution.merged_with(Attribution::from_metadata(metadata));
        }

        let status = match session.payment_status {
            CheckoutSessionPaymentStatus::Paid => "paid",
            CheckoutSessionPaymentStatus::Unpaid => "unpaid",
            CheckoutSessionPaymentStatus::NoPaymentRequired => "no_payment_required",
        };

        Self {
            session_id: session.id.to_string(),
            amount_cents: session.amount_total.unwrap_or(0),
            currency: session
                .currency
                .map(|c| c.to_string().to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            status,
            customer_id,
            customer_email,
            received_at: OffsetDateTime::now_utc(),
            attribution,
        }
    }

    /// `"49.00 USD"`
    pub fn amount_display(&self) -> String {
        format!("{} {}", format_cents(self.amount_cents), self.currency)
    }

    /// Render the spreadsheet row for this payment. Column order must match
    /// [`SHEET_COLUMNS`].
    pub fn sheet_row(&self) -> Vec<String> {
        let attr = &self.attribution;
        vec![
            self.session_id.clone(),
            self.received_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| String::new()),
            format_cents(self.amount_cents),
            self.currency.clone(),
            self.status.to_string(),
            self.customer_email.clone().unwrap_or_default(),
            self.customer_id.clone().unwrap_or_default(),
            attr.utm_source.clone().unwrap_or_default(),
            attr.utm_medium.clone().unwrap_or_default(),
            attr.utm_campaign.clone().unwrap_or_default(),
            attr.ad_name.clone().unwrap_or_default(),
            attr.campaign_name.clone().unwrap_or_default(),
            attr.country.clone().unwrap_or_default(),
            attr.city.clone().unwrap_or_default(),
        ]
    }
}

/// `4905` -> `"49.05"`, `-50` -> `"-0.50"`. Negative totals do not occur on
/// a completed checkout, but a refund-adjusted session must not render as
/// `"0.-50"`.
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Spreadsheet header, in the order `sheet_row` emits values
pub const SHEET_COLUMNS: &[&str] = &[
    "session_id",
    "received_at",
    "amount",
    "currency",
    "status",
    "customer_email",
    "customer_id",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "ad_name",
    "campaign_name",
    "country",
    "city",
];

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn attribution_reads_known_keys() {
        let meta = metadata(&[
            ("utm_source", "facebook"),
            ("utm_campaign", "spring_sale"),
            ("country", "DE"),
            ("unrelated", "ignored"),
        ]);

        let attr = Attribution::from_metadata(&meta);
        assert_eq!(attr.utm_source.as_deref(), Some("facebook"));
        assert_eq!(attr.utm_campaign.as_deref(), Some("spring_sale"));
        assert_eq!(attr.country.as_deref(), Some("DE"));
        assert!(attr.utm_medium.is_none());
    }

    #[test]
    fn attribution_ignores_empty_values() {
        let meta = metadata(&[("utm_source", "")]);
        let attr = Attribution::from_metadata(&meta);
        assert!(attr.utm_source.is_none());
        assert!(attr.is_empty());
    }

    #[test]
    fn session_metadata_overrides_customer_metadata() {
        let customer = Attribution::from_metadata(&metadata(&[
            ("utm_source", "google"),
            ("city", "Berlin"),
        ]));
        let session = Attribution::from_metadata(&metadata(&[("utm_source", "facebook")]));

        let merged = customer.merged_with(session);
        assert_eq!(merged.utm_source.as_deref(), Some("facebook"));
        assert_eq!(merged.city.as_deref(), Some("Berlin"));
    }

    #[test]
    fn from_session_flattens_fields() {
        let mut session = CheckoutSession::default();
        session.id = "cs_test_a1b2c3".parse().unwrap();
        session.amount_total = Some(4900);
        session.currency = Some(stripe::Currency::USD);
        session.payment_status = CheckoutSessionPaymentStatus::Paid;
        session.metadata = Some(metadata(&[("utm_source", "facebook")]));

        let record = PaymentRecord::from_session(&session, None);
        assert_eq!(record.session_id, "cs_test_a1b2c3");
        assert_eq!(record.amount_cents, 4900);
        assert_eq!(record.currency, "USD");
        assert_eq!(record.status, "paid");
        assert_eq!(record.attribution.utm_source.as_deref(), Some("facebook"));
        assert!(record.customer_email.is_none());
    }

    #[test]
    fn amount_display_pads_cents() {
        let mut session = CheckoutSession::default();
        session.amount_total = Some(4905);
        session.currency = Some(stripe::Currency::EUR);
        let record = PaymentRecord::from_session(&session, None);
        assert_eq!(record.amount_display(), "49.05 EUR");

        let mut session = CheckoutSession::default();
        session.amount_total = Some(100);
        let record = PaymentRecord::from_session(&session, None);
        assert_eq!(record.amount_display(), "1.00 USD");
    }

    #[test]
    fn negative_amount_keeps_sign_in_front() {
        let mut session = CheckoutSession::default();
        session.amount_total = Some(-50);
        session.currency = Some(stripe::Currency::USD);

        let record = PaymentRecord::from_session(&session, None);
        assert_eq!(record.amount_display(), "-0.50 USD");
        assert_eq!(record.sheet_row()[2], "-0.50");

        let mut session = CheckoutSession::default();
        session.amount_total = Some(-1234);
        let record = PaymentRecord::from_session(&session, None);
        assert_eq!(record.amount_display(), "-12.34 USD");
    }

    #[test]
    fn sheet_row_matches_column_order() {
        let mut session = CheckoutSession::default();
        session.id = "cs_test_row".parse().unwrap();
        session.amount_total = Some(1999);
        session.currency = Some(stripe::Currency::USD);
        session.payment_status = CheckoutSessionPaymentStatus::Paid;

        let record = PaymentRecord::from_session(&session, None);
        let row = record.sheet_row();

        assert_eq!(row.len(), SHEET_COLUMNS.len());
        assert_eq!(row[0], "cs_test_row");
        assert_eq!(row[2], "19.99");
        assert_eq!(row[3], "USD");
        assert_eq!(row[4], "paid");
        // Absent optional fields render as empty cells, not placeholders
        assert_eq!(row[5], "");
    }
}
