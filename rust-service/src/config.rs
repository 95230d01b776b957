//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup. The Stripe signing secret and the
//! GoHighLevel API key are required; everything else has a default.

use std::env;

use tracing::warn;
use url::Url;

use crate::error::ConfigError;

/// Default GoHighLevel API v2 base URL.
pub const DEFAULT_GHL_BASE_URL: &str = "https://services.leadconnectorhq.com";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stripe webhook signing secret (`whsec_...`)
    pub stripe_webhook_secret: String,

    /// Maximum allowed skew in seconds between the signature timestamp and now.
    /// Zero disables the check.
    pub signature_tolerance_secs: u64,

    /// GoHighLevel private integration / API key
    pub ghl_api_key: String,

    /// GoHighLevel location (sub-account) used to scope contact searches
    pub ghl_location_id: Option<String>,

    /// GoHighLevel API base URL
    pub ghl_base_url: Url,

    /// Outbound HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Port for the web server to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url_raw =
            env::var("GHL_BASE_URL").unwrap_or_else(|_| DEFAULT_GHL_BASE_URL.to_string());
        let ghl_base_url = Url::parse(&base_url_raw).map_err(|e| ConfigError::InvalidUrl {
            name: "GHL_BASE_URL",
            reason: e.to_string(),
        })?;

        Ok(Config {
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,

            signature_tolerance_secs: parse_or("STRIPE_SIGNATURE_TOLERANCE_SECS", 300),

            ghl_api_key: required("GHL_API_KEY")?,

            ghl_location_id: optional("GHL_LOCATION_ID"),

            ghl_base_url,

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 10_000),

            port: parse_or("PORT", 5000),
        })
    }
}

/// Read a variable that must be present and non-blank.
fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Read a variable, treating blank values as absent.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a numeric variable, falling back to `default` when absent or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}
