//! Error types shared across the service.

use reqwest::StatusCode;
use thiserror::Error;

/// Startup configuration errors. Any of these is fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
}

/// Stripe webhook signature verification failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,

    #[error("malformed Stripe-Signature header: {0}")]
    MalformedHeader(&'static str),

    #[error("signature timestamp outside tolerance ({age_secs}s > {tolerance_secs}s)")]
    TimestampOutOfTolerance { age_secs: u64, tolerance_secs: u64 },

    #[error("signing secret cannot be used as an HMAC key")]
    InvalidSecret,

    #[error("no v1 signature matches the payload")]
    Mismatch,
}

/// Failures turning a verified body into a typed event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("invalid {event_type} object: {source}")]
    InvalidObject {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// GoHighLevel API call failures.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("GHL request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GHL returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("GHL response could not be decoded: {0}")]
    Decode(String),
}

impl CrmError {
    /// Whether a redelivery of the webhook could plausibly succeed.
    ///
    /// Network failures, timeouts (including 408), rate limiting and 5xx
    /// responses are transient. Authorization and validation failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CrmError::Transport(_) => true,
            CrmError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            CrmError::Decode(_) => false,
        }
    }
}
