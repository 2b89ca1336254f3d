//! Batch-level accounting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AttemptFailure, Doi, DownloadRecord};

/// A DOI that no source could satisfy, with the reason from each source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDoi {
    pub doi: Doi,
    pub attempts: Vec<AttemptFailure>,

    /// Set when processing was aborted by an unexpected error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one batch run.
///
/// Every input DOI appears exactly once, in either `successful` or `failed`.
/// Both lists keep input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// DOIs that were downloaded, in input order
    pub successful: Vec<Doi>,

    /// DOIs that failed, in the order failures occurred
    pub failed: Vec<Doi>,

    /// One record per successful DOI
    pub records: Vec<DownloadRecord>,

    /// One entry per failed DOI
    pub failures: Vec<FailedDoi>,

    /// When the batch started
    pub started_at: DateTime<Utc>,

    /// When the batch finished
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// Create an empty result stamped with the current time
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
            records: Vec::new(),
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Record a successful DOI
    pub fn push_success(&mut self, record: DownloadRecord) {
        self.successful.push(record.doi.clone());
        self.records.push(record);
    }

    /// Record a failed DOI
    pub fn push_failure(&mut self, doi: Doi, attempts: Vec<AttemptFailure>) {
        self.failed.push(doi.clone());
        self.failures.push(FailedDoi {
            doi,
            attempts,
            error: None,
        });
    }

    /// Record a DOI whose processing was aborted
    pub fn push_error(&mut self, doi: Doi, error: impl Into<String>) {
        self.failed.push(doi.clone());
        self.failures.push(FailedDoi {
            doi,
            attempts: Vec::new(),
            error: Some(error.into()),
        });
    }

    /// Number of DOIs processed
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// Number of successful downloads
    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    /// Number of failed downloads
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Total bytes written
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.bytes).sum()
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}
