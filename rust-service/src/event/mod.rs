//! Stripe event parsing and dispatch.
//!
//! ## Flow
//!
//! ```text
//! raw body → parse_event() → StripeEvent → PaymentEvent::from_object() → Some(PaymentEvent) | None
//! ```
//!
//! `None` means the event type is not one we sync and should be acknowledged.

pub mod types;

use crate::error::EventError;

pub use types::{
    Address, CheckoutSession, PartyDetails, PaymentIntent, StripeEvent,
    CHECKOUT_SESSION_COMPLETED, PAYMENT_INTENT_SUCCEEDED,
};

/// Metadata key GoHighLevel payment links use to carry the contact ID.
pub const CONTACT_ID_METADATA_KEY: &str = "contactId";

/// Parse a verified request body into an event envelope.
pub fn parse_event(body: &[u8]) -> Result<StripeEvent, EventError> {
    serde_json::from_slice(body).map_err(EventError::InvalidJson)
}

/// A payment event of one of the two supported types.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    CheckoutSessionCompleted(CheckoutSession),
    PaymentIntentSucceeded(PaymentIntent),
}

/// How the target contact should be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactIdentity<'a> {
    /// Contact ID supplied directly in the event metadata
    ContactId(&'a str),
    /// Customer email, with the field it came from
    Email { email: &'a str, source: &'static str },
}

/// Billing details chosen for the sync, with the field they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBilling<'a> {
    pub name: Option<&'a str>,
    pub address: Option<&'a Address>,
    pub source: &'static str,
}

impl PaymentEvent {
    /// Build a typed event from the envelope's type and `data.object`.
    ///
    /// Returns `Ok(None)` for event types that are not synced.
    pub fn from_object(
        event_type: &str,
        object: serde_json::Value,
    ) -> Result<Option<Self>, EventError> {
        match event_type {
            CHECKOUT_SESSION_COMPLETED => serde_json::from_value(object)
                .map(|s| Some(PaymentEvent::CheckoutSessionCompleted(s)))
                .map_err(|source| EventError::InvalidObject {
                    event_type: CHECKOUT_SESSION_COMPLETED,
                    source,
                }),
            PAYMENT_INTENT_SUCCEEDED => serde_json::from_value(object)
                .map(|i| Some(PaymentEvent::PaymentIntentSucceeded(i)))
                .map_err(|source| EventError::InvalidObject {
                    event_type: PAYMENT_INTENT_SUCCEEDED,
                    source,
                }),
            _ => Ok(None),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::CheckoutSessionCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            PaymentEvent::PaymentIntentSucceeded(_) => PAYMENT_INTENT_SUCCEEDED,
        }
    }

    /// The Stripe ID of the session or intent.
    pub fn object_id(&self) -> Option<&str> {
        match self {
            PaymentEvent::CheckoutSessionCompleted(s) => s.id.as_deref(),
            PaymentEvent::PaymentIntentSucceeded(i) => i.id.as_deref(),
        }
    }

    /// Amount in minor currency units, zero when absent.
    pub fn amount_minor(&self) -> i64 {
        match self {
            PaymentEvent::CheckoutSessionCompleted(s) => s.amount_total.unwrap_or(0),
            PaymentEvent::PaymentIntentSucceeded(i) => i.amount.unwrap_or(0),
        }
    }

    /// Three-letter currency code of the amount, when Stripe sent one.
    pub fn currency(&self) -> Option<&str> {
        match self {
            PaymentEvent::CheckoutSessionCompleted(s) => s.currency.as_deref(),
            PaymentEvent::PaymentIntentSucceeded(i) => i.currency.as_deref(),
        }
    }

    fn metadata_contact_id(&self) -> Option<&str> {
        let metadata = match self {
            PaymentEvent::CheckoutSessionCompleted(s) => s.metadata.as_ref(),
            PaymentEvent::PaymentIntentSucceeded(i) => i.metadata.as_ref(),
        }?;

        metadata
            .get(CONTACT_ID_METADATA_KEY)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }

    /// Decide how to find the contact.
    ///
    /// A `contactId` in metadata wins. Otherwise the first non-empty email is
    /// used, checked in the order Stripe most reliably populates them.
    pub fn contact_identity(&self) -> Option<ContactIdentity<'_>> {
        if let Some(id) = self.metadata_contact_id() {
            return Some(ContactIdentity::ContactId(id));
        }

        let candidates: Vec<(Option<&str>, &'static str)> = match self {
            PaymentEvent::CheckoutSessionCompleted(s) => vec![
                (
                    s.customer_details.as_ref().and_then(|d| d.email.as_deref()),
                    "customer_details.email",
                ),
                (s.customer_email.as_deref(), "customer_email"),
            ],
            PaymentEvent::PaymentIntentSucceeded(i) => vec![
                (i.receipt_email.as_deref(), "receipt_email"),
                (
                    i.billing_details.as_ref().and_then(|d| d.email.as_deref()),
                    "billing_details.email",
                ),
                (
                    i.first_charge_billing().and_then(|d| d.email.as_deref()),
                    "charges[0].billing_details.email",
                ),
                (
                    i.latest_charge_billing().and_then(|d| d.email.as_deref()),
                    "latest_charge.billing_details.email",
                ),
            ],
        };

        candidates.into_iter().find_map(|(email, source)| {
            email
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(|email| ContactIdentity::Email { email, source })
        })
    }

    /// Pick the billing name and address to sync.
    ///
    /// Payment intents prefer their own `billing_details`, then the first
    /// legacy charge, then an expanded `latest_charge`; a source is only
    /// skipped when it has no name. Checkout sessions use `customer_details`.
    pub fn billing(&self) -> ResolvedBilling<'_> {
        match self {
            PaymentEvent::CheckoutSessionCompleted(s) => match s.customer_details.as_ref() {
                Some(details) => ResolvedBilling {
                    name: details.name.as_deref(),
                    address: details.address.as_ref(),
                    source: "customer_details",
                },
                None => ResolvedBilling {
                    source: "none",
                    ..Default::default()
                },
            },
            PaymentEvent::PaymentIntentSucceeded(i) => {
                let sources = [
                    (i.billing_details.as_ref(), "billing_details"),
                    (i.first_charge_billing(), "charges[0].billing_details"),
                    (i.latest_charge_billing(), "latest_charge.billing_details"),
                ];

                let chosen = sources
                    .iter()
                    .find(|(details, _)| details.is_some_and(PartyDetails::has_name))
                    .or_else(|| sources.iter().find(|(details, _)| details.is_some()))
                    .copied();

                match chosen {
                    Some((Some(details), source)) => ResolvedBilling {
                        name: details.name.as_deref(),
                        address: details.address.as_ref(),
                        source,
                    },
                    _ => ResolvedBilling {
                        source: "none",
                        ..Default::default()
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent(object: serde_json::Value) -> PaymentEvent {
        PaymentEvent::from_object(PAYMENT_INTENT_SUCCEEDED, object)
            .unwrap()
            .unwrap()
    }

    fn session(object: serde_json::Value) -> PaymentEvent {
        PaymentEvent::from_object(CHECKOUT_SESSION_COMPLETED, object)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_parse_event_invalid_json() {
        assert!(matches!(
            parse_event(b"not json"),
            Err(EventError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_unsupported_type_is_none() {
        let result = PaymentEvent::from_object("customer.created", json!({"id": "cus_1"})).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_supported_type_with_wrong_shape_is_error() {
        let result = PaymentEvent::from_object(PAYMENT_INTENT_SUCCEEDED, json!({"amount": "lots"}));
        assert!(matches!(result, Err(EventError::InvalidObject { .. })));
    }

    #[test]
    fn test_amounts() {
        assert_eq!(intent(json!({"amount": 1999})).amount_minor(), 1999);
        assert_eq!(session(json!({"amount_total": 4200})).amount_minor(), 4200);
        assert_eq!(intent(json!({})).amount_minor(), 0);
    }

    #[test]
    fn test_currency() {
        assert_eq!(intent(json!({"amount": 1999, "currency": "usd"})).currency(), Some("usd"));
        assert_eq!(session(json!({"currency": "gbp"})).currency(), Some("gbp"));
        assert_eq!(intent(json!({})).currency(), None);
    }

    #[test]
    fn test_contact_id_from_metadata_wins() {
        let event = intent(json!({
            "receipt_email": "ada@example.com",
            "metadata": {"contactId": "ghl_contact_1"}
        }));
        assert_eq!(
            event.contact_identity(),
            Some(ContactIdentity::ContactId("ghl_contact_1"))
        );
    }

    #[test]
    fn test_blank_contact_id_falls_back_to_email() {
        let event = intent(json!({
            "receipt_email": "ada@example.com",
            "metadata": {"contactId": "  "}
        }));
        assert_eq!(
            event.contact_identity(),
            Some(ContactIdentity::Email {
                email: "ada@example.com",
                source: "receipt_email"
            })
        );
    }

    #[test]
    fn test_intent_email_fallback_order() {
        let event = intent(json!({
            "receipt_email": "",
            "charges": {"data": [{"billing_details": {"email": "charge@example.com"}}]},
            "latest_charge": {"id": "ch_1", "billing_details": {"email": "latest@example.com"}}
        }));
        assert_eq!(
            event.contact_identity(),
            Some(ContactIdentity::Email {
                email: "charge@example.com",
                source: "charges[0].billing_details.email"
            })
        );
    }

    #[test]
    fn test_session_email_sources() {
        let event = session(json!({
            "customer_details": {"email": "details@example.com"},
            "customer_email": "prefill@example.com"
        }));
        assert!(matches!(
            event.contact_identity(),
            Some(ContactIdentity::Email { email: "details@example.com", .. })
        ));

        let event = session(json!({"customer_email": "prefill@example.com"}));
        assert!(matches!(
            event.contact_identity(),
            Some(ContactIdentity::Email { source: "customer_email", .. })
        ));
    }

    #[test]
    fn test_no_identity() {
        assert_eq!(intent(json!({"amount": 100})).contact_identity(), None);
    }

    #[test]
    fn test_billing_prefers_named_source() {
        let event = intent(json!({
            "billing_details": {"name": null, "address": {"city": "Nowhere"}},
            "charges": {"data": [{"billing_details": {"name": "Ada", "address": {"city": "London"}}}]}
        }));
        let billing = event.billing();
        assert_eq!(billing.name, Some("Ada"));
        assert_eq!(billing.address.and_then(|a| a.city.as_deref()), Some("London"));
        assert_eq!(billing.source, "charges[0].billing_details");
    }

    #[test]
    fn test_billing_unnamed_source_still_used() {
        let event = intent(json!({
            "billing_details": {"address": {"city": "Nowhere"}}
        }));
        let billing = event.billing();
        assert_eq!(billing.name, None);
        assert_eq!(billing.source, "billing_details");
    }

    #[test]
    fn test_billing_none() {
        assert_eq!(intent(json!({})).billing().source, "none");
        assert_eq!(session(json!({})).billing().source, "none");
    }
}
