//! Unpaywall open-access lookup.
//!
//! Used as the terminal fallback once every mirror has failed.
//! API documentation: <https://unpaywall.org/products/api>

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::Doi;
use crate::sources::{OpenAccessLookup, SourceError};
use crate::utils::HttpClient;

/// Unpaywall API base URL
pub const UNPAYWALL_API_BASE: &str = "https://api.unpaywall.org/v2";

/// Contact email used when none is configured
pub const DEFAULT_CONTACT_EMAIL: &str = "example@example.com";

/// Unpaywall lookup
///
/// The API is free and keyless but requires a contact email on every request.
#[derive(Debug, Clone)]
pub struct UnpaywallSource {
    client: Arc<HttpClient>,
    base_url: String,
    email: String,
}

impl UnpaywallSource {
    /// Create a lookup against the public API.
    ///
    /// The contact email falls back to `UNPAYWALL_EMAIL`, then to a placeholder.
    pub fn new(client: Arc<HttpClient>, email: Option<String>) -> Self {
        let email = email
            .or_else(|| std::env::var("UNPAYWALL_EMAIL").ok())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTACT_EMAIL.to_string());

        Self {
            client,
            base_url: UNPAYWALL_API_BASE.to_string(),
            email,
        }
    }

    /// Point the lookup at a different API base
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Contact email sent with each request
    pub fn email(&self) -> &str {
        &self.email
    }

    fn lookup_url(&self, doi: &Doi) -> String {
        format!("{}/{}", self.base_url, doi)
    }
}

#[async_trait]
impl OpenAccessLookup for UnpaywallSource {
    fn id(&self) -> &str {
        "unpaywall"
    }

    async fn resolve_pdf_url(&self, doi: &Doi) -> Result<Option<String>, SourceError> {
        let url = self.lookup_url(doi);

        let response = self
            .client
            .client()
            .get(&url)
            .query(&[("email", self.email.as_str())])
            .send()
            .await
            .map_err(|e| {
                SourceError::Transport(format!("Failed to lookup DOI in Unpaywall: {}", e))
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                "Unpaywall request failed for DOI: {}. Status code: {}",
                doi,
                response.status().as_u16()
            );
            return Ok(None);
        }

        let body: UnpaywallResponse = response.json().await.map_err(|e| {
            SourceError::Parse(format!("Failed to parse Unpaywall response: {}", e))
        })?;

        Ok(body.pdf_url())
    }
}

/// The subset of the Unpaywall response we care about
#[derive(Debug, Default, Deserialize)]
struct UnpaywallResponse {
    #[serde(default)]
    best_oa_location: Option<UnpaywallLocation>,
    #[serde(default)]
    oa_locations: Option<Vec<UnpaywallLocation>>,
}

#[derive(Debug, Default, Deserialize)]
struct UnpaywallLocation {
    #[serde(default)]
    url_for_pdf: Option<String>,
}

impl UnpaywallLocation {
    fn pdf(&self) -> Option<&str> {
        self.url_for_pdf.as_deref().filter(|u| !u.is_empty())
    }
}

impl UnpaywallResponse {
    /// Best location first, then the first listed location exposing a PDF
    fn pdf_url(&self) -> Option<String> {
        self.best_oa_location
            .as_ref()
            .and_then(UnpaywallLocation::pdf)
            .or_else(|| {
                self.oa_locations
                    .iter()
                    .flatten()
                    .find_map(UnpaywallLocation::pdf)
            })
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> UnpaywallResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_prefers_best_location() {
        let response = parse(
            r#"{
                "best_oa_location": {"url_for_pdf": "https://best.example/a.pdf"},
                "oa_locations": [{"url_for_pdf": "https://other.example/a.pdf"}]
            }"#,
        );
        assert_eq!(
            response.pdf_url().as_deref(),
            Some("https://best.example/a.pdf")
        );
    }

    #[test]
    fn test_falls_back_to_first_location_with_pdf() {
        let response = parse(
            r#"{
                "best_oa_location": {"url_for_pdf": null},
                "oa_locations": [
                    {"url_for_pdf": null},
                    {"url_for_pdf": "https://second.example/a.pdf"},
                    {"url_for_pdf": "https://third.example/a.pdf"}
                ]
            }"#,
        );
        assert_eq!(
            response.pdf_url().as_deref(),
            Some("https://second.example/a.pdf")
        );
    }

    #[test]
    fn test_no_pdf_anywhere() {
        let empty = parse(r#"{"best_oa_location": null, "oa_locations": []}"#);
        assert_eq!(empty.pdf_url(), None);
        assert_eq!(parse(r#"{"is_oa": false}"#).pdf_url(), None);
    }

    #[test]
    fn test_lookup_url_and_email() {
        let client = Arc::new(HttpClient::new().unwrap());
        let source = UnpaywallSource::new(client, Some("me@example.org".to_string()))
            .with_base_url("http://localhost:1234/v2/");
        assert_eq!(source.email(), "me@example.org");
        assert_eq!(
            source.lookup_url(&Doi::normalize("10.1/x")),
            "http://localhost:1234/v2/10.1/x"
        );
        assert_eq!(source.id(), "unpaywall");
    }
}
