//! # Paper Mirror
//!
//! Retrieves scholarly PDFs by DOI from an ordered list of mirror sites, falling
//! back to an open-access lookup when every mirror fails, and keeps batch-level
//! accounting of which DOIs succeeded.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Doi, DownloadRecord, BatchResult)
//! - [`sources`]: Collaborator traits (`Fetcher`, `OpenAccessLookup`) and the Unpaywall source
//! - [`download`]: The per-DOI fallback chain, the batch processor and result packaging
//! - [`utils`]: HTTP client with bypass retry, PDF link extraction, URL resolution,
//!   content validation, request pacing and progress reporting
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal output helpers

pub mod config;
pub mod download;
pub mod models;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use download::{BatchProcessor, FallbackChain};
pub use models::{BatchResult, Doi};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
