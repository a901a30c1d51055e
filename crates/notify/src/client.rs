//! Stripe client wrapper
//!
//! Thin wrapper around `stripe::Client` carrying the webhook secret alongside
//! the API key, so verification and outbound reads share one handle.

use stripe::{Customer, CustomerId};

use crate::error::{NotifyError, NotifyResult};

/// Stripe credentials loaded from the environment
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`)
    pub secret_key: String,
    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: String,
}

impl StripeConfig {
    pub fn from_env() -> NotifyResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| NotifyError::MissingConfig("STRIPE_SECRET_KEY".to_string()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| NotifyError::MissingConfig("STRIPE_WEBHOOK_SECRET".to_string()))?;

        Ok(Self {
            secret_key,
            webhook_secret,
        })
    }
}

/// Shared Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    client: stripe::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let client = stripe::Client::new(config.secret_key.clone());
        Self { client, config }
    }

    pub fn from_env() -> NotifyResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn inner(&self) -> &stripe::Client {
        &self.client
    }

    /// Fetch a Customer to pick up the attribution metadata stored on it
    pub async fn fetch_customer(&self, id: &CustomerId) -> NotifyResult<Customer> {
        let customer = Customer::retrieve(&self.client, id, &[]).await?;
        Ok(customer)
    }
}
