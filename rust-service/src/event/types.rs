//! Stripe webhook payload types.
//!
//! Only the fields the sync reads are modelled. Everything is optional
//! because Stripe omits or nulls fields freely depending on the API version
//! and on how the payment was collected.

use std::collections::HashMap;

use serde::Deserialize;

/// Event type emitted when a Checkout Session finishes.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Event type emitted when a PaymentIntent is captured.
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

// =============================================================================
// Envelope
// =============================================================================

/// The outer Stripe event envelope.
///
/// `data.object` is kept as raw JSON until the event type is known.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    /// Event identifier (`evt_...`)
    #[serde(default)]
    pub id: Option<String>,
    /// Event type, e.g. `payment_intent.succeeded`
    #[serde(rename = "type")]
    pub event_type: String,
    /// Whether the event came from live mode
    #[serde(default)]
    pub livemode: bool,
    /// API version used to render the object
    #[serde(default)]
    pub api_version: Option<String>,
    /// Absent on some event shapes; `object` is then `null`
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: serde_json::Value,
}

// =============================================================================
// Shared sub-objects
// =============================================================================

/// A postal address as Stripe renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Name, email and address of a payer.
///
/// Used for both `billing_details` on charges and `customer_details` on
/// Checkout Sessions, which share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartyDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

impl PartyDetails {
    /// Whether a non-empty name is present.
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

/// The subset of a Charge the sync reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Charge {
    #[serde(default)]
    pub billing_details: Option<PartyDetails>,
}

/// Legacy `charges` list on PaymentIntents (API versions before 2022-11-15).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeList {
    #[serde(default)]
    pub data: Vec<Charge>,
}

/// `latest_charge` is an ID unless the webhook endpoint expands it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LatestCharge {
    Id(String),
    Expanded(Box<Charge>),
}

// =============================================================================
// Event objects
// =============================================================================

/// `data.object` of a `checkout.session.completed` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub id: Option<String>,
    /// Total in minor currency units
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Lowercase ISO code, e.g. `usd`
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_details: Option<PartyDetails>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// `data.object` of a `payment_intent.succeeded` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentIntent {
    #[serde(default)]
    pub id: Option<String>,
    /// Amount in minor currency units
    #[serde(default)]
    pub amount: Option<i64>,
    /// Lowercase ISO code, e.g. `usd`
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub billing_details: Option<PartyDetails>,
    #[serde(default)]
    pub charges: Option<ChargeList>,
    #[serde(default)]
    pub latest_charge: Option<LatestCharge>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl PaymentIntent {
    /// Billing details of the first charge in the legacy `charges` list.
    pub fn first_charge_billing(&self) -> Option<&PartyDetails> {
        self.charges
            .as_ref()?
            .data
            .first()?
            .billing_details
            .as_ref()
    }

    /// Billing details of `latest_charge`, when it was expanded.
    pub fn latest_charge_billing(&self) -> Option<&PartyDetails> {
        match self.latest_charge.as_ref()? {
            LatestCharge::Expanded(charge) => charge.billing_details.as_ref(),
            LatestCharge::Id(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_deserialization() {
        let json = r#"{
            "id": "evt_123",
            "object": "event",
            "type": "checkout.session.completed",
            "livemode": false,
            "data": {"object": {"id": "cs_test_1"}}
        }"#;

        let event: StripeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id.as_deref(), Some("evt_123"));
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);
        assert!(!event.livemode);
        assert_eq!(event.data.object["id"], "cs_test_1");
    }

    #[test]
    fn test_envelope_requires_type() {
        let json = r#"{"id": "evt_123", "data": {"object": {}}}"#;
        assert!(serde_json::from_str::<StripeEvent>(json).is_err());
    }

    #[test]
    fn test_envelope_without_data() {
        let json = r#"{"id": "evt_x", "type": "customer.created"}"#;
        let event: StripeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "customer.created");
        assert!(event.data.object.is_null());
    }

    #[test]
    fn test_payment_intent_with_nulls() {
        let json = r#"{
            "id": "pi_1",
            "amount": 1999,
            "receipt_email": null,
            "charges": {"object": "list", "data": [
                {"id": "ch_1", "billing_details": {"name": "Ada", "email": null, "address": {"line1": "1 Main", "line2": null}}}
            ]},
            "latest_charge": "ch_1",
            "metadata": {}
        }"#;

        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.amount, Some(1999));
        assert!(intent.receipt_email.is_none());
        let billing = intent.first_charge_billing().unwrap();
        assert_eq!(billing.name.as_deref(), Some("Ada"));
        assert!(intent.latest_charge_billing().is_none());
    }

    #[test]
    fn test_latest_charge_expanded() {
        let json = r#"{
            "id": "pi_1",
            "latest_charge": {"id": "ch_9", "billing_details": {"name": "Grace"}}
        }"#;

        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(
            intent.latest_charge_billing().and_then(|b| b.name.as_deref()),
            Some("Grace")
        );
    }

    #[test]
    fn test_party_details_has_name() {
        let mut details = PartyDetails::default();
        assert!(!details.has_name());
        details.name = Some("  ".to_string());
        assert!(!details.has_name());
        details.name = Some("Ada".to_string());
        assert!(details.has_name());
    }
}
