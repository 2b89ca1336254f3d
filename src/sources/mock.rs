//! In-memory collaborators for testing purposes.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{Doi, FetchOutcome};
use crate::sources::{Fetcher, OpenAccessLookup, SourceError};

/// A fetcher that serves predefined responses keyed by URL.
///
/// Unknown URLs answer 404. Every requested URL is logged in order.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
    requests: Mutex<Vec<String>>,
}

#[derive(Debug, Clone)]
enum MockResponse {
    Outcome {
        status: u16,
        body: Vec<u8>,
        content_type: Option<String>,
    },
    TransportError(String),
    Panic,
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a response for a URL.
    pub fn respond(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.insert(
            url,
            MockResponse::Outcome {
                status,
                body: body.into(),
                content_type: None,
            },
        )
    }

    /// Serve an HTML page for a URL.
    pub fn respond_html(&self, url: &str, html: &str) -> &Self {
        self.insert(
            url,
            MockResponse::Outcome {
                status: 200,
                body: html.as_bytes().to_vec(),
                content_type: Some("text/html; charset=utf-8".to_string()),
            },
        )
    }

    /// Serve a PDF-looking payload of the given size for a URL.
    pub fn respond_pdf(&self, url: &str, size: usize) -> &Self {
        self.insert(
            url,
            MockResponse::Outcome {
                status: 200,
                body: fake_pdf(size),
                content_type: Some("application/pdf".to_string()),
            },
        )
    }

    /// Fail requests to a URL at the transport level.
    pub fn fail(&self, url: &str, message: &str) -> &Self {
        self.insert(url, MockResponse::TransportError(message.to_string()))
    }

    /// Panic when a URL is requested.
    pub fn panic_on(&self, url: &str) -> &Self {
        self.insert(url, MockResponse::Panic)
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL starts with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.starts_with(prefix))
            .count()
    }

    fn insert(&self, url: &str, response: MockResponse) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, _headers: &HeaderMap) -> Result<FetchOutcome, SourceError> {
        self.requests.lock().unwrap().push(url.to_string());

        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(MockResponse::Outcome {
                status,
                body,
                content_type,
            }) => {
                let mut outcome = FetchOutcome::new(url, status, body);
                outcome.content_type = content_type;
                Ok(outcome)
            }
            Some(MockResponse::TransportError(message)) => Err(SourceError::Transport(message)),
            Some(MockResponse::Panic) => panic!("mock fetcher asked to panic for {}", url),
            None => Ok(FetchOutcome::new(url, 404, b"Not Found".to_vec())),
        }
    }
}

/// An open-access lookup with fixed answers per DOI.
///
/// DOIs without an answer resolve to `None`.
#[derive(Debug, Default)]
pub struct MockOpenAccess {
    answers: Mutex<HashMap<String, String>>,
    lookups: Mutex<Vec<String>>,
}

impl MockOpenAccess {
    /// Create a lookup that knows nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `doi` to `pdf_url`.
    pub fn answer(&self, doi: &str, pdf_url: &str) -> &Self {
        self.answers
            .lock()
            .unwrap()
            .insert(doi.to_string(), pdf_url.to_string());
        self
    }

    /// DOIs looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl OpenAccessLookup for MockOpenAccess {
    fn id(&self) -> &str {
        "mock"
    }

    async fn resolve_pdf_url(&self, doi: &Doi) -> Result<Option<String>, SourceError> {
        self.lookups.lock().unwrap().push(doi.to_string());
        Ok(self.answers.lock().unwrap().get(doi.as_str()).cloned())
    }
}

/// Helper to create a PDF-looking payload for testing.
pub fn fake_pdf(size: usize) -> Vec<u8> {
    let mut body = b"%PDF-1.4\n".to_vec();
    body.resize(size.max(body.len()), b'0');
    body
}
