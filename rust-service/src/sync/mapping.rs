//! Mapping from Stripe billing data to GoHighLevel custom fields.

use serde::Serialize;

use crate::crm::CustomField;
use crate::event::PaymentEvent;

/// GoHighLevel custom field keys, in the order they are sent.
pub const FIELD_CARD_NAME: &str = "card_name";
pub const FIELD_ADDRESS_LINE_1: &str = "card_address_line_1";
pub const FIELD_ADDRESS_LINE_2: &str = "card_address_line_2";
pub const FIELD_ADDRESS_CITY: &str = "card_address_city";
pub const FIELD_ADDRESS_STATE: &str = "card_address_state";
pub const FIELD_ADDRESS_COUNTRY: &str = "card_address_country";
pub const FIELD_TOTAL_SPEND: &str = "total_spend";

/// Billing values extracted from a payment event.
///
/// Every field is always present; missing data becomes an empty string so
/// the CRM update overwrites the complete field set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BillingFields {
    pub name: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub country: String,
    /// Decimal amount, e.g. `"19.99"`
    pub amount: String,
}

impl BillingFields {
    pub fn from_event(event: &PaymentEvent) -> Self {
        let billing = event.billing();
        let address = billing.address;

        let text = |value: Option<&String>| value.map(|s| s.trim().to_string()).unwrap_or_default();

        BillingFields {
            name: billing.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            address_line_1: text(address.and_then(|a| a.line1.as_ref())),
            address_line_2: text(address.and_then(|a| a.line2.as_ref())),
            city: text(address.and_then(|a| a.city.as_ref())),
            state: text(address.and_then(|a| a.state.as_ref())),
            country: text(address.and_then(|a| a.country.as_ref())),
            amount: format_minor_units(event.amount_minor()),
        }
    }

    /// The custom field list for the contact update.
    pub fn custom_fields(&self) -> Vec<CustomField> {
        vec![
            CustomField::new(FIELD_CARD_NAME, &self.name),
            CustomField::new(FIELD_ADDRESS_LINE_1, &self.address_line_1),
            CustomField::new(FIELD_ADDRESS_LINE_2, &self.address_line_2),
            CustomField::new(FIELD_ADDRESS_CITY, &self.city),
            CustomField::new(FIELD_ADDRESS_STATE, &self.state),
            CustomField::new(FIELD_ADDRESS_COUNTRY, &self.country),
            CustomField::new(FIELD_TOTAL_SPEND, &self.amount),
        ]
    }
}

/// Format an amount in minor units (cents) as a two-decimal string.
///
/// Integer arithmetic only, so `1999` is always `"19.99"`.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
