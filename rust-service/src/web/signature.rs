//! Stripe webhook signature verification.
//!
//! Stripe signs webhook requests using HMAC-SHA256.
//! Reference: https://docs.stripe.com/webhooks#verify-manually

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Parsed `Stripe-Signature` header.
///
/// The header looks like `t=1492774577,v1=5257a869...,v0=6ffbb59b...`.
/// Several `v1` entries may be present while a secret is being rolled.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: u64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };

        match key {
            "t" => {
                let parsed = value
                    .parse::<u64>()
                    .map_err(|_| SignatureError::MalformedHeader("timestamp is not a number"))?;
                timestamp = Some(parsed);
            }
            "v1" => signatures.push(value),
            // v0 is a test-mode scheme we never trust
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader("missing timestamp"))?;

    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader("no v1 signature"));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Verify a Stripe webhook signature against the raw request body.
///
/// # Arguments
///
/// * `payload` - The raw, unparsed request body
/// * `header` - The `Stripe-Signature` header value
/// * `secret` - The endpoint signing secret (`whsec_...`), used verbatim as the HMAC key
/// * `tolerance_secs` - Maximum allowed age of the signature timestamp; `0` disables the check
pub fn verify_stripe_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: u64,
) -> Result<(), SignatureError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    verify_at(payload, header, secret, tolerance_secs, now)
}

fn verify_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: u64,
    now: u64,
) -> Result<(), SignatureError> {
    let parsed = parse_header(header).inspect_err(|e| {
        warn!(error = %e, header_length = header.len(), "stripe_signature_malformed");
    })?;

    if tolerance_secs > 0 {
        let age_secs = now.abs_diff(parsed.timestamp);
        if age_secs > tolerance_secs {
            warn!(
                signature_time = parsed.timestamp,
                current_time = now,
                age_seconds = age_secs,
                max_age_seconds = tolerance_secs,
                "stripe_signature_stale"
            );
            return Err(SignatureError::TimestampOutOfTolerance {
                age_secs,
                tolerance_secs,
            });
        }
    }

    let expected = compute_signature(secret, parsed.timestamp, payload).map_err(|_| {
        warn!("stripe_signature_invalid_secret");
        SignatureError::InvalidSecret
    })?;

    // Constant-time comparison against every candidate
    let valid = parsed
        .signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate));

    if !valid {
        warn!(
            candidates = parsed.signatures.len(),
            "stripe_signature_mismatch"
        );
        return Err(SignatureError::Mismatch);
    }

    Ok(())
}

/// Compute the hex-encoded `v1` signature: HMAC-SHA256(secret, "{timestamp}.{payload}").
pub fn compute_signature(
    secret: &str,
    timestamp: u64,
    payload: &[u8],
) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
