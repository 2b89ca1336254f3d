//! Data carried through a single retrieval attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::Doi;

/// Which transport produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Request went straight to the target
    Direct,
    /// Request was replayed through the rendering proxy after a 403
    BypassProxy,
}

/// Result of one HTTP attempt. Not persisted.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// URL that was actually requested
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Raw response body
    pub body: Vec<u8>,

    /// Value of the Content-Type header, if any
    pub content_type: Option<String>,

    /// Transport that produced this response
    pub transport: Transport,
}

impl FetchOutcome {
    /// Create an outcome for a direct request
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
            content_type: None,
            transport: Transport::Direct,
        }
    }

    /// Set the content type
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the transport
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Only a plain 200 counts as success
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body decoded permissively as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Where a PDF came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "base_url", rename_all = "snake_case")]
pub enum DownloadSource {
    /// A mirror, identified by its base URL
    Mirror(String),
    /// The open-access lookup
    OpenAccess,
}

impl fmt::Display for DownloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadSource::Mirror(base) => write!(f, "mirror {}", base),
            DownloadSource::OpenAccess => f.write_str("open access"),
        }
    }
}

/// Non-fatal observations made while validating a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Payload is below the size floor but did not look like HTML
    SmallFile { bytes: usize },
    /// Content-Type does not announce a PDF and the URL does not end in `.pdf`
    ContentTypeMismatch { content_type: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::SmallFile { bytes } => {
                write!(f, "downloaded file is very small ({} bytes)", bytes)
            }
            ValidationWarning::ContentTypeMismatch { content_type } => {
                write!(f, "content may not be a PDF (Content-Type: {})", content_type)
            }
        }
    }
}

/// Verdict on a downloaded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Keep the file, possibly with warnings
    Accept { warnings: Vec<ValidationWarning> },
    /// The payload is an HTML page masquerading as a document
    RejectAsHtml,
}

impl ValidationOutcome {
    /// Whether the payload was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accept { .. })
    }
}

/// A PDF that was written and kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// DOI the file belongs to
    pub doi: Doi,

    /// Source that served the file
    pub source: DownloadSource,

    /// Location of the written file
    pub path: PathBuf,

    /// File size in bytes
    pub bytes: u64,

    /// Warnings raised by validation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationWarning>,
}

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Timeout or connection failure
    Transport,
    /// HTTP status other than 200
    NonSuccessStatus,
    /// No PDF link could be extracted from the page
    NoPdfLink,
    /// Payload was an HTML error page
    ContentRejected,
    /// No open-access copy was found
    OpenAccessUnavailable,
    /// Anything else (I/O, parse errors, panics)
    Other,
}

/// One source that did not yield a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    /// Source that was tried
    pub source: DownloadSource,

    /// What went wrong
    pub kind: FailureKind,

    /// Human-readable detail
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_outcome_status() {
        assert!(FetchOutcome::new("https://a", 200, Vec::new()).is_ok());
        assert!(!FetchOutcome::new("https://a", 204, Vec::new()).is_ok());
        assert!(!FetchOutcome::new("https://a", 403, Vec::new()).is_ok());
    }

    #[test]
    fn test_fetch_outcome_text_is_lossy() {
        let outcome = FetchOutcome::new("https://a", 200, vec![b'<', 0xff, b'>']);
        assert_eq!(outcome.text(), "<\u{fffd}>");
    }

    #[test]
    fn test_download_source_display() {
        assert_eq!(
            DownloadSource::Mirror("https://m.example/".to_string()).to_string(),
            "mirror https://m.example/"
        );
        assert_eq!(DownloadSource::OpenAccess.to_string(), "open access");
    }

    #[test]
    fn test_validation_outcome() {
        assert!(ValidationOutcome::Accept { warnings: vec![] }.is_accepted());
        assert!(!ValidationOutcome::RejectAsHtml.is_accepted());
    }
}
