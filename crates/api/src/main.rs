//! payrelay API server
//!
//! Receives Stripe payment webhooks and relays completed checkouts to
//! Telegram, Slack, and a Google Sheets log.

use std::net::SocketAddr;

use payrelay_notify::NotifyService;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payrelay_api::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,payrelay_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting payrelay API server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;

    // Assemble the notification service; unconfigured destinations are
    // skipped with a warning inside from_env
    let notify = NotifyService::from_env()?;

    let state = AppState::new(config.clone(), notify);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Parse bind address
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Starting server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
