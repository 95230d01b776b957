//! PaySync Web Server - Stripe webhook receiver.
//!
//! This binary:
//! - Receives signed Stripe webhooks on `POST /webhook`
//! - Syncs billing details of completed payments to GoHighLevel contacts
//! - Answers liveness probes on `/health`

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paysync::util::redact::mask_secret;
use paysync::{router, AppState, Config, GhlClient};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal outside local development
    let dotenv_loaded = dotenv::dotenv().is_ok();

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!(dotenv_loaded = dotenv_loaded, "web_server_starting");

    // Load configuration; missing secrets are fatal
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        port = config.port,
        stripe_webhook_secret_configured = !config.stripe_webhook_secret.is_empty(),
        ghl_api_key = %mask_secret(&config.ghl_api_key),
        ghl_location_id_configured = config.ghl_location_id.is_some(),
        ghl_base_url = %config.ghl_base_url,
        request_timeout_ms = config.request_timeout_ms,
        signature_tolerance_secs = config.signature_tolerance_secs,
        "config_loaded"
    );

    let crm = GhlClient::from_config(&config).context("Failed to create HTTP client")?;

    // Create application state
    let port = config.port;
    let state = AppState::new(config, crm);

    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
