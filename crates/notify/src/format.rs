//! Human-readable rendering of a payment
//!
//! Produces the platform-neutral parts of a notification: a headline and a
//! list of label/value lines. Channels layer their own encoding on top
//! (MarkdownV2 escaping for Telegram, mrkdwn for Slack).

use crate::payment::PaymentRecord;

/// One-line summary, e.g. `New payment: 49.00 USD`
pub fn payment_headline(record: &PaymentRecord) -> String {
    format!("New payment: {}", record.amount_display())
}

/// Label/value detail lines, skipping absent fields entirely
pub fn payment_lines(record: &PaymentRecord) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();

    if let Some(email) = &record.customer_email {
        lines.push(("Email", email.clone()));
    }

    let attr = &record.attribution;
    if let Some(source) = &attr.utm_source {
        let mut value = source.clone();
        if let Some(medium) = &attr.utm_medium {
            value.push_str(" / ");
            value.push_str(medium);
        }
        lines.push(("Source", value));
    }
    if let Some(campaign) = attr.utm_campaign.as_ref().or(attr.campaign_name.as_ref()) {
        lines.push(("Campaign", campaign.clone()));
    }
    if let Some(ad) = &attr.ad_name {
        lines.push(("Ad", ad.clone()));
    }

    match (&attr.city, &attr.country) {
        (Some(city), Some(country)) => lines.push(("Location", format!("{city}, {country}"))),
        (Some(city), None) => lines.push(("Location", city.clone())),
        (None, Some(country)) => lines.push(("Location", country.clone())),
        (None, None) => {}
    }

    lines.push(("Session", record.session_id.clone()));
    lines
}
