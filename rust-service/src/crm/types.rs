//! GoHighLevel API v2 request and response bodies.

use serde::{Deserialize, Serialize};

/// One custom field value in a contact update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomField {
    pub key: &'static str,
    pub field_value: String,
}

impl CustomField {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            field_value: value.into(),
        }
    }
}

/// Body of `PUT /contacts/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    pub custom_fields: Vec<CustomField>,
}

/// Body of `GET /contacts/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSearchResponse {
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// A contact record as returned by search. Only identifying fields are kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Opaque reference to the contact an update is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRef(pub String);

impl ContactRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Search results whose email equals `email`, ignoring case and surrounding
/// whitespace.
pub fn exact_matches<'a>(
    contacts: &'a [Contact],
    email: &'a str,
) -> impl Iterator<Item = &'a Contact> + 'a {
    let email = email.trim();
    contacts.iter().filter(move |c| {
        c.email
            .as_deref()
            .is_some_and(|e| e.trim().eq_ignore_ascii_case(email))
    })
}

/// Choose the contact to update from search results.
///
/// GoHighLevel's `query` search is fuzzy, so only exact email matches
/// qualify. The first of those is chosen; `None` when no result carries the
/// email.
pub fn select_contact<'a>(contacts: &'a [Contact], email: &'a str) -> Option<&'a Contact> {
    exact_matches(contacts, email).next()
}
