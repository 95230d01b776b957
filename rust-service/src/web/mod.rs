//! Web server module.
//!
//! Exposes two routes:
//! - `POST /webhook`: signed Stripe events
//! - `/health`: liveness probe, any method

pub mod handlers;
pub mod signature;

use axum::{
    routing::{any, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, stripe_webhook, AppState, HealthResponse, WebhookResponse};
pub use signature::{compute_signature, verify_stripe_signature, STRIPE_SIGNATURE_HEADER};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", any(health))
        .route("/webhook", post(stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
