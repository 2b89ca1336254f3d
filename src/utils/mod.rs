//! Utility modules supporting retrieval.
//!
//! - [`HttpClient`]: HTTP client with identity rotation and a bypass-proxy retry on 403
//! - [`PdfLinkExtractor`]: Ordered heuristics that find a PDF link in a landing page
//! - [`resolve_pdf_url`]: Resolve relative links against a mirror's origin
//! - [`ContentValidator`], [`SniffValidator`]: Reject HTML error pages served as PDFs
//! - [`DelayScheduler`], [`RandomDelay`]: Pacing between mirror attempts
//! - [`ProgressSink`], [`ProgressReporter`]: Batch progress reporting
//!
//! # Link extraction
//!
//! ```rust
//! use paper_mirror::utils::{resolve_pdf_url, Heuristic, PdfLinkExtractor};
//!
//! let html = r#"<iframe src="//cdn.example/a.pdf"></iframe>"#;
//! let candidate = PdfLinkExtractor::new().extract(html).unwrap();
//! assert_eq!(candidate.heuristic, Heuristic::InlineFrame);
//! assert_eq!(
//!     resolve_pdf_url(&candidate.url, "https://mirror.example/"),
//!     "https://cdn.example/a.pdf"
//! );
//! ```

mod delay;
mod extract;
mod http;
mod progress;
mod resolve;
mod validate;

pub use delay::{DelayRange, DelayScheduler, NoDelay, RandomDelay, MAX_DELAY_SECS};
pub use extract::{Heuristic, PdfCandidate, PdfLinkExtractor};
pub use http::{HttpClient, DEFAULT_BYPASS_PROXY, DEFAULT_TIMEOUT, USER_AGENTS};
pub use progress::{fraction, NoProgress, ProgressReporter, ProgressSink};
pub use resolve::resolve_pdf_url;
pub use validate::{
    looks_like_html, ContentValidator, SniffValidator, DEFAULT_MIN_SIZE, DEFAULT_SNIFF_WINDOW,
};
