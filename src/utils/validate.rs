//! Content validation for downloaded payloads.
//!
//! Mirrors sometimes answer a PDF request with an HTML error page and a 200
//! status. Small payloads are sniffed for an HTML document marker and
//! rejected if one is found.

use crate::models::{ValidationOutcome, ValidationWarning};

/// Payloads below this many bytes are sniffed for HTML
pub const DEFAULT_MIN_SIZE: usize = 10_000;

/// Number of leading bytes inspected when sniffing
pub const DEFAULT_SNIFF_WINDOW: usize = 1_000;

/// Decides whether a downloaded payload is kept
pub trait ContentValidator: Send + Sync + std::fmt::Debug {
    /// Judge a payload.
    ///
    /// `content_type` is the declared Content-Type; `source_url` is the URL
    /// the bytes were fetched from.
    fn validate(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        source_url: &str,
    ) -> ValidationOutcome;
}

/// Size floor plus leading-byte HTML sniffing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffValidator {
    min_size: usize,
    sniff_window: usize,
}

impl SniffValidator {
    /// Validator with the default floor and window
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MIN_SIZE, DEFAULT_SNIFF_WINDOW)
    }

    /// Validator with custom limits
    pub fn with_limits(min_size: usize, sniff_window: usize) -> Self {
        Self {
            min_size,
            sniff_window,
        }
    }

    /// Size floor in bytes
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Sniff window in bytes
    pub fn sniff_window(&self) -> usize {
        self.sniff_window
    }
}

impl Default for SniffValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the leading bytes contain an HTML document marker
pub fn looks_like_html(bytes: &[u8], window: usize) -> bool {
    let head = &bytes[..bytes.len().min(window)];
    // Invalid bytes are dropped, not replaced, so a split marker still matches
    let text: String = String::from_utf8_lossy(head)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .to_lowercase();
    text.contains("<html") || text.contains("<!doctype html")
}

impl ContentValidator for SniffValidator {
    fn validate(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        source_url: &str,
    ) -> ValidationOutcome {
        let mut warnings = Vec::new();

        let declared = content_type.unwrap_or_default();
        if !declared.contains("application/pdf") && !source_url.ends_with(".pdf") {
            warnings.push(ValidationWarning::ContentTypeMismatch {
                content_type: declared.to_string(),
            });
        }

        if bytes.len() < self.min_size {
            if looks_like_html(bytes, self.sniff_window) {
                return ValidationOutcome::RejectAsHtml;
            }
            warnings.push(ValidationWarning::SmallFile { bytes: bytes.len() });
        }

        ValidationOutcome::Accept { warnings }
    }
}
