//! Core data models for DOI retrieval and batch accounting.

mod batch;
mod doi;
mod download;

pub use batch::{BatchResult, FailedDoi};
pub use doi::{parse_doi_list, Doi, DOI_RESOLVER_PREFIX};
pub use download::{
    AttemptFailure, DownloadRecord, DownloadSource, FailureKind, FetchOutcome, Transport,
    ValidationOutcome, ValidationWarning,
};
