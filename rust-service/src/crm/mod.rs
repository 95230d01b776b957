//! GoHighLevel CRM integration.

pub mod client;
pub mod types;

pub use client::{GhlClient, GHL_API_VERSION};
pub use types::{
    exact_matches, select_contact, Contact, ContactRef, CustomField, UpdateContactRequest,
};
