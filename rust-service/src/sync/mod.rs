//! Payment → contact synchronisation.
//!
//! ## Processing Flow
//!
//! ```text
//! PaymentEvent → BillingFields → (lookup by email | metadata contactId) → update custom fields
//! ```
//!
//! Each call makes at most one lookup and at most one update request.

pub mod mapping;

use tracing::{error, info, warn};

use crate::crm::{ContactRef, GhlClient};
use crate::error::CrmError;
use crate::event::{ContactIdentity, PaymentEvent};

pub use mapping::{format_minor_units, BillingFields};

/// Terminal state of one sync attempt.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Custom fields were written
    Updated { contact_id: ContactRef },
    /// The event carried neither a contact ID nor an email
    NoContactIdentity,
    /// The email search matched no contact
    ContactNotFound { email: String },
    /// The email search failed
    LookupFailed(CrmError),
    /// The contact was resolved but the update failed
    UpdateFailed {
        contact_id: ContactRef,
        error: CrmError,
    },
}

impl SyncOutcome {
    /// Short machine-readable label used in responses and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Updated { .. } => "updated",
            SyncOutcome::NoContactIdentity => "no_contact_identity",
            SyncOutcome::ContactNotFound { .. } => "contact_not_found",
            SyncOutcome::LookupFailed(_) => "lookup_failed",
            SyncOutcome::UpdateFailed { .. } => "update_failed",
        }
    }

    /// Whether Stripe should redeliver the event.
    ///
    /// Only transient CRM failures qualify; everything else would fail the
    /// same way again.
    pub fn should_retry(&self) -> bool {
        match self {
            SyncOutcome::LookupFailed(e) | SyncOutcome::UpdateFailed { error: e, .. } => {
                e.is_transient()
            }
            _ => false,
        }
    }

    /// The CRM error behind a failed outcome, if any.
    pub fn error(&self) -> Option<&CrmError> {
        match self {
            SyncOutcome::LookupFailed(e) | SyncOutcome::UpdateFailed { error: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Sync one payment event to GoHighLevel.
pub async fn sync_payment(crm: &GhlClient, event: &PaymentEvent) -> SyncOutcome {
    let event_type = event.event_type();
    let object_id = event.object_id().unwrap_or("unknown");

    let fields = BillingFields::from_event(event);
    let billing_source = event.billing().source;

    info!(
        event_type = event_type,
        object_id = %object_id,
        billing_source = billing_source,
        amount_minor = event.amount_minor(),
        currency = event.currency().unwrap_or(""),
        name = %fields.name,
        address_line_1 = %fields.address_line_1,
        address_line_2 = %fields.address_line_2,
        city = %fields.city,
        state = %fields.state,
        country = %fields.country,
        amount = %fields.amount,
        "billing_fields_extracted"
    );

    let contact_id = match event.contact_identity() {
        Some(ContactIdentity::ContactId(id)) => {
            info!(object_id = %object_id, contact_id = %id, "contact_id_from_metadata");
            ContactRef(id.to_string())
        }
        Some(ContactIdentity::Email { email, source }) => {
            info!(object_id = %object_id, email = %email, email_source = source, "contact_email_found");

            match crm.find_contact_by_email(email).await {
                Ok(Some(contact_id)) => contact_id,
                Ok(None) => {
                    warn!(object_id = %object_id, email = %email, "ghl_contact_not_found");
                    return SyncOutcome::ContactNotFound {
                        email: email.to_string(),
                    };
                }
                Err(e) => {
                    error!(
                        object_id = %object_id,
                        email = %email,
                        transient = e.is_transient(),
                        error = %e,
                        "ghl_lookup_failed"
                    );
                    return SyncOutcome::LookupFailed(e);
                }
            }
        }
        None => {
            error!(object_id = %object_id, event_type = event_type, "contact_identity_missing");
            return SyncOutcome::NoContactIdentity;
        }
    };

    match crm.update_custom_fields(&contact_id, fields.custom_fields()).await {
        Ok(()) => {
            info!(object_id = %object_id, contact_id = %contact_id, "ghl_contact_updated");
            SyncOutcome::Updated { contact_id }
        }
        Err(e) => {
            error!(
                object_id = %object_id,
                contact_id = %contact_id,
                transient = e.is_transient(),
                error = %e,
                "ghl_update_failed"
            );
            SyncOutcome::UpdateFailed {
                contact_id,
                error: e,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn status(code: u16) -> CrmError {
        CrmError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_outcome_retry_policy() {
        assert!(SyncOutcome::LookupFailed(status(502)).should_retry());
        assert!(SyncOutcome::UpdateFailed {
            contact_id: ContactRef("c1".to_string()),
            error: status(500),
        }
        .should_retry());

        assert!(!SyncOutcome::LookupFailed(status(401)).should_retry());
        assert!(!SyncOutcome::UpdateFailed {
            contact_id: ContactRef("c1".to_string()),
            error: status(422),
        }
        .should_retry());
        assert!(!SyncOutcome::NoContactIdentity.should_retry());
        assert!(!SyncOutcome::ContactNotFound {
            email: "a@b.c".to_string()
        }
        .should_retry());
        assert!(!SyncOutcome::Updated {
            contact_id: ContactRef("c1".to_string())
        }
        .should_retry());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SyncOutcome::NoContactIdentity.label(), "no_contact_identity");
        assert_eq!(SyncOutcome::LookupFailed(status(500)).label(), "lookup_failed");
        assert!(SyncOutcome::NoContactIdentity.error().is_none());
        assert!(SyncOutcome::LookupFailed(status(500)).error().is_some());
    }
}
