//! PaySync - Stripe payment events to GoHighLevel contact fields.
//!
//! This library backs the `paysync-web` binary. It verifies Stripe webhooks,
//! extracts billing details from supported payment events and writes them to
//! the matching GoHighLevel contact as custom fields.
//!
//! ## Architecture
//!
//! ```text
//! Stripe → POST /webhook → verify → parse → map fields → GHL lookup → GHL update
//! ```

pub mod config;
pub mod crm;
pub mod error;
pub mod event;
pub mod sync;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use crm::GhlClient;
pub use error::{ConfigError, CrmError, EventError, SignatureError};
pub use event::PaymentEvent;
pub use sync::{sync_payment, BillingFields, SyncOutcome};
pub use web::{router, AppState};
