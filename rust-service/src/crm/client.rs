//! GoHighLevel API v2 client.
//!
//! Two calls are used: contact search by email and contact update. Neither
//! is retried here; Stripe redelivers the webhook when we answer 5xx.

use std::time::Duration;

use reqwest::{header::ACCEPT, Client, RequestBuilder, Response};
use tracing::{error, info, warn};
use url::Url;

use super::types::{
    exact_matches, select_contact, ContactRef, ContactSearchResponse, CustomField,
    UpdateContactRequest,
};
use crate::error::CrmError;
use crate::util::redact::{mask_secret, preview};
use crate::Config;

/// Value of the `Version` header GoHighLevel API v2 requires.
pub const GHL_API_VERSION: &str = "2021-07-28";

/// Maximum number of response body characters kept in logs and errors.
const BODY_PREVIEW_CHARS: usize = 1000;

/// Shared GoHighLevel client. Cheap to clone.
#[derive(Clone)]
pub struct GhlClient {
    http: Client,
    base_url: Url,
    api_key: String,
    location_id: Option<String>,
}

impl std::fmt::Debug for GhlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhlClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &mask_secret(&self.api_key))
            .field("location_id", &self.location_id)
            .finish()
    }
}

impl GhlClient {
    /// Build a client from configuration, applying the outbound timeout.
    pub fn from_config(config: &Config) -> Result<Self, CrmError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.ghl_base_url.clone(),
            api_key: config.ghl_api_key.clone(),
            location_id: config.ghl_location_id.clone(),
        })
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("Version", GHL_API_VERSION)
            .header(ACCEPT, "application/json")
    }

    /// Search contacts by email and pick the one to update.
    ///
    /// Returns `Ok(None)` when no result carries exactly this email.
    pub async fn find_contact_by_email(&self, email: &str) -> Result<Option<ContactRef>, CrmError> {
        // Trailing empty segment keeps the `/contacts/` form the API documents
        let url = self.endpoint(&["contacts", ""]);

        let mut query: Vec<(&str, &str)> = vec![("query", email)];
        if let Some(location_id) = self.location_id.as_deref() {
            query.push(("locationId", location_id));
        }

        info!(email = %email, url = %url, "ghl_lookup_starting");

        let response = self
            .authorized(self.http.get(url).query(&query))
            .send()
            .await
            .inspect_err(|e| log_transport_error("ghl_lookup", e))?;

        let response = ensure_success("ghl_lookup", response).await?;

        let body = response.text().await?;
        let result: ContactSearchResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %preview(&body, BODY_PREVIEW_CHARS), "ghl_lookup_decode_failed");
            CrmError::Decode(e.to_string())
        })?;

        let Some(contact) = select_contact(&result.contacts, email) else {
            info!(
                email = %email,
                fuzzy_results = result.contacts.len(),
                "ghl_lookup_no_match"
            );
            return Ok(None);
        };

        let exact = exact_matches(&result.contacts, email).count();

        info!(
            email = %email,
            search_results = result.contacts.len(),
            exact_matches = exact,
            contact_id = %contact.id,
            contact_email = ?contact.email,
            contact_first_name = ?contact.first_name,
            contact_last_name = ?contact.last_name,
            "ghl_lookup_complete"
        );

        if exact > 1 {
            warn!(
                email = %email,
                exact_matches = exact,
                chosen = %contact.id,
                "ghl_lookup_ambiguous"
            );
        }

        Ok(Some(ContactRef(contact.id.clone())))
    }

    /// Write the full custom field set to a contact in one request.
    pub async fn update_custom_fields(
        &self,
        contact: &ContactRef,
        custom_fields: Vec<CustomField>,
    ) -> Result<(), CrmError> {
        let url = self.endpoint(&["contacts", contact.as_str()]);
        let body = UpdateContactRequest { custom_fields };

        info!(
            contact_id = %contact,
            url = %url,
            field_count = body.custom_fields.len(),
            "ghl_update_starting"
        );

        let response = self
            .authorized(self.http.put(url).json(&body))
            .send()
            .await
            .inspect_err(|e| log_transport_error("ghl_update", e))?;

        let response = ensure_success("ghl_update", response).await?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        info!(
            contact_id = %contact,
            status_code = status,
            body = %preview(&text, BODY_PREVIEW_CHARS),
            "ghl_update_complete"
        );

        Ok(())
    }
}

/// Turn a non-2xx response into `CrmError::Status`.
async fn ensure_success(operation: &'static str, response: Response) -> Result<Response, CrmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = preview(&body, BODY_PREVIEW_CHARS);

    error!(
        operation = operation,
        status_code = status.as_u16(),
        body = %body,
        "ghl_request_rejected"
    );

    Err(CrmError::Status { status, body })
}

fn log_transport_error(operation: &'static str, e: &reqwest::Error) {
    if e.is_timeout() {
        error!(operation = operation, error = %e, "ghl_request_timeout");
    } else if e.is_connect() {
        error!(operation = operation, error = %e, "ghl_request_connect_error");
    } else {
        error!(operation = operation, error = %e, "ghl_request_error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, location_id: Option<&str>) -> GhlClient {
        GhlClient {
            http: Client::new(),
            base_url: Url::parse(&server.uri()).unwrap(),
            api_key: "pit-test-key".to_string(),
            location_id: location_id.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_find_contact_sends_auth_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contacts/"))
            .and(query_param("query", "ada@example.com"))
            .and(query_param("locationId", "loc_1"))
            .and(header("Authorization", "Bearer pit-test-key"))
            .and(header("Version", GHL_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "contacts": [{"id": "c1", "email": "ada@example.com"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("loc_1"));
        let found = client.find_contact_by_email("ada@example.com").await.unwrap();
        assert_eq!(found, Some(ContactRef("c1".to_string())));
    }

    #[tokio::test]
    async fn test_find_contact_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contacts/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"contacts": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert_eq!(client.find_contact_by_email("nobody@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_contact_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .find_contact_by_email("ada@example.com")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_find_contact_bad_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .find_contact_by_email("ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Decode(_)));
    }

    #[tokio::test]
    async fn test_update_sends_custom_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/contacts/c1"))
            .and(body_json(serde_json::json!({
                "customFields": [{"key": "total_spend", "field_value": "19.99"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"succeded": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server, None)
            .update_custom_fields(
                &ContactRef("c1".to_string()),
                vec![CustomField::new("total_spend", "19.99")],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_unauthorized_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid JWT"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .update_custom_fields(&ContactRef("c1".to_string()), vec![])
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, CrmError::Status { body, .. } if body == "Invalid JWT"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let server = MockServer::start().await;
        let client = client_for(&server, None);
        drop(server);

        let err = client
            .find_contact_by_email("ada@example.com")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = GhlClient {
            http: Client::new(),
            base_url: Url::parse("https://services.example.com/v2/").unwrap(),
            api_key: String::new(),
            location_id: None,
        };

        assert_eq!(
            client.endpoint(&["contacts", ""]).as_str(),
            "https://services.example.com/v2/contacts/"
        );
        assert_eq!(
            client.endpoint(&["contacts", "a/b"]).as_str(),
            "https://services.example.com/v2/contacts/a%2Fb"
        );
    }

    #[test]
    fn test_debug_masks_api_key() {
        let client = GhlClient {
            http: Client::new(),
            base_url: Url::parse("https://services.example.com").unwrap(),
            api_key: "pit-1234567890-abcdef".to_string(),
            location_id: None,
        };

        let debug = format!("{:?}", client);
        assert!(!debug.contains("pit-1234567890-abcdef"));
    }
}
