//! Webhook endpoint handlers.
//!
//! The Stripe handler runs the whole pipeline inline:
//! 1. Verify the signature over the raw body
//! 2. Parse the event and dispatch on its type
//! 3. Sync supported events to GoHighLevel
//!
//! Every path ends in a defined status code. Only transient CRM failures
//! return 5xx, so Stripe redelivers exactly the events that may succeed later.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::crm::GhlClient;
use crate::error::SignatureError;
use crate::event::{parse_event, PaymentEvent};
use crate::sync::sync_payment;
use crate::web::signature::{verify_stripe_signature, STRIPE_SIGNATURE_HEADER};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub crm: GhlClient,
}

impl AppState {
    pub fn new(config: Config, crm: GhlClient) -> Self {
        Self {
            config: Arc::new(config),
            crm,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint. Always healthy; it touches no dependencies.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

// =============================================================================
// Stripe Webhook
// =============================================================================

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    fn ok(status: &'static str) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                received: true,
                status,
                error: None,
            }),
        )
    }

    fn rejected(code: StatusCode, status: &'static str, error: String) -> (StatusCode, Json<Self>) {
        (
            code,
            Json(Self {
                received: false,
                status,
                error: Some(error),
            }),
        )
    }
}

/// Stripe webhook endpoint.
///
/// Takes the body as raw bytes: the signature covers the exact bytes sent,
/// so it must be checked before any JSON parsing.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        "webhook_received"
    );

    // RECEIVED → VERIFIED
    let verified = match signature {
        Some(signature) => verify_stripe_signature(
            &body,
            signature,
            &state.config.stripe_webhook_secret,
            state.config.signature_tolerance_secs,
        ),
        None => Err(SignatureError::MissingHeader),
    };

    if let Err(e) = verified {
        warn!(error = %e, "stripe_signature_invalid");
        return WebhookResponse::rejected(StatusCode::BAD_REQUEST, "invalid_signature", e.to_string());
    }

    // VERIFIED → PARSED
    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "stripe_payload_invalid");
            return WebhookResponse::rejected(StatusCode::BAD_REQUEST, "invalid_payload", e.to_string());
        }
    };

    let event_id = event.id.as_deref().unwrap_or("unknown").to_string();

    info!(
        event_id = %event_id,
        event_type = %event.event_type,
        livemode = event.livemode,
        api_version = ?event.api_version,
        "stripe_event_verified"
    );

    let payment = match PaymentEvent::from_object(&event.event_type, event.data.object) {
        Ok(Some(payment)) => payment,
        Ok(None) => {
            info!(event_id = %event_id, event_type = %event.event_type, "stripe_event_ignored");
            return WebhookResponse::ok("ignored");
        }
        Err(e) => {
            error!(event_id = %event_id, error = %e, "stripe_payload_invalid");
            return WebhookResponse::rejected(StatusCode::BAD_REQUEST, "invalid_payload", e.to_string());
        }
    };

    // PARSED → LOOKED_UP → {NOT_FOUND | UPDATED | UPDATE_FAILED}
    let outcome = sync_payment(&state.crm, &payment).await;

    info!(
        event_id = %event_id,
        outcome = outcome.label(),
        retry = outcome.should_retry(),
        "stripe_event_processed"
    );

    match outcome.error() {
        Some(e) if outcome.should_retry() => WebhookResponse::rejected(
            StatusCode::INTERNAL_SERVER_ERROR,
            outcome.label(),
            e.to_string(),
        ),
        Some(e) => (
            StatusCode::OK,
            Json(WebhookResponse {
                received: true,
                status: outcome.label(),
                error: Some(e.to_string()),
            }),
        ),
        None => WebhookResponse::ok(outcome.label()),
    }
}
