//! Retrieval collaborators with a trait-based seam.
//!
//! The fallback chain never talks to the network directly. It goes through
//! two traits so that mirror quirks and lookup services can be swapped without
//! touching the chain:
//!
//! - [`Fetcher`]: performs a GET and reports status, body and content type.
//!   The production implementation is [`crate::utils::HttpClient`], which
//!   rotates client identities and replays forbidden requests through a
//!   rendering proxy.
//! - [`OpenAccessLookup`]: resolves a DOI to a legitimate open-access PDF URL.
//!   The production implementation is [`UnpaywallSource`].
//!
//! Both traits have in-memory doubles in [`mock`] for tests.

pub mod mock;
mod unpaywall;

pub use mock::{MockFetcher, MockOpenAccess};
pub use unpaywall::{UnpaywallSource, UNPAYWALL_API_BASE};

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::models::{Doi, FailureKind, FetchOutcome};

/// Issues HTTP GET requests on behalf of the fallback chain.
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Headers to use for one source attempt.
    ///
    /// Called once per attempt so that the page request and the follow-up
    /// PDF request present the same client identity.
    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// Fetch a URL.
    ///
    /// Any non-200 status is returned as an outcome, not an error. Transport
    /// failures are returned as [`SourceError::Transport`].
    async fn fetch(&self, url: &str, headers: &HeaderMap) -> Result<FetchOutcome, SourceError>;
}

/// Resolves a DOI to an open-access PDF location.
#[async_trait]
pub trait OpenAccessLookup: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this lookup (used in logs)
    fn id(&self) -> &str;

    /// Find a PDF URL for the DOI.
    ///
    /// Returns `Ok(None)` when the service answers but has no PDF, or answers
    /// with a non-success status.
    async fn resolve_pdf_url(&self, doi: &Doi) -> Result<Option<String>, SourceError>;
}

/// Errors raised while trying a single source.
///
/// All of these are recoverable at the source level: the fallback chain moves
/// on to the next mirror, or to the open-access lookup.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Timeout or connection failure
    #[error("Network error: {0}")]
    Transport(String),

    /// HTTP status other than 200
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// No heuristic found a PDF link in the page
    #[error("No PDF link found: {0}")]
    NoPdfLink(String),

    /// The payload was an HTML page, not a document
    #[error("Content rejected: {0}")]
    ContentRejected(String),

    /// No open-access copy was found
    #[error("Open access unavailable: {0}")]
    OpenAccessUnavailable(String),

    /// Parsing error (JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Classify this error for batch accounting
    pub fn kind(&self) -> FailureKind {
        match self {
            SourceError::Transport(_) => FailureKind::Transport,
            SourceError::Status { .. } => FailureKind::NonSuccessStatus,
            SourceError::NoPdfLink(_) => FailureKind::NoPdfLink,
            SourceError::ContentRejected(_) => FailureKind::ContentRejected,
            SourceError::OpenAccessUnavailable(_) => FailureKind::OpenAccessUnavailable,
            SourceError::Parse(_) | SourceError::Io(_) | SourceError::Other(_) => {
                FailureKind::Other
            }
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SourceError::Transport("timeout".into()).kind(),
            FailureKind::Transport
        );
        assert_eq!(
            SourceError::Status {
                url: "https://m/".into(),
                status: 404
            }
            .kind(),
            FailureKind::NonSuccessStatus
        );
        assert_eq!(
            SourceError::NoPdfLink("10.1/x".into()).kind(),
            FailureKind::NoPdfLink
        );
        assert_eq!(
            SourceError::ContentRejected("html".into()).kind(),
            FailureKind::ContentRejected
        );
        assert_eq!(
            SourceError::Io(std::io::Error::other("disk")).kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn test_status_message() {
        let err = SourceError::Status {
            url: "https://m.example/10.1/x".into(),
            status: 403,
        };
        assert_eq!(err.to_string(), "HTTP 403 from https://m.example/10.1/x");
    }
}
