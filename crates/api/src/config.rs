//! Server configuration
//!
//! Only the HTTP listener is configured here; Stripe, Telegram, Slack and
//! Sheets credentials are read by their own `from_env` constructors in the
//! notify crate so each destination can be enabled independently.

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self { bind_address })
    }
}
