//! Progress tracking for batch runs.
//!
//! The batch processor reports after every DOI through [`ProgressSink`].
//! [`ProgressReporter`] renders that as a terminal progress bar; [`NoProgress`]
//! discards it.
//!
//! # Usage
//!
//! ```ignore
//! use paper_mirror::utils::ProgressReporter;
//!
//! let reporter = ProgressReporter::new("Downloading papers", dois.len());
//! let result = processor.run(&dois, &reporter).await;
//! reporter.finish();
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::models::Doi;

/// Receives batch progress notifications
pub trait ProgressSink: Send + Sync {
    /// A DOI is about to be processed (`index` is zero-based)
    fn on_doi_start(&self, _index: usize, _total: usize, _doi: &Doi) {}

    /// A DOI finished; `done` DOIs out of `total` are complete
    fn on_doi_done(&self, done: usize, total: usize, doi: &Doi, succeeded: bool);
}

/// Fraction of work completed, in `0.0..=1.0`
pub fn fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}

/// Discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_doi_done(&self, _done: usize, _total: usize, _doi: &Doi, _succeeded: bool) {}
}

/// Progress bar over the DOIs of a batch
///
/// Quiet reporters keep counting but draw nothing.
#[derive(Clone)]
pub struct ProgressReporter {
    /// Name of the operation being tracked
    name: String,

    /// Total number of DOIs
    total: usize,

    /// Completed DOIs
    current: Arc<AtomicUsize>,

    /// Successful DOIs
    succeeded: Arc<AtomicUsize>,

    /// Start time for rate reporting
    start_time: Instant,

    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(name: &str, total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg}: {bar:40.cyan/blue} {pos}/{len} ({percent}%) [{elapsed_precise}]",
        ) {
            bar.set_style(style.progress_chars("█▓▒░ "));
        }
        bar.set_message(name.to_string());
        Self::with_bar(name, total, bar)
    }

    /// Create a quiet reporter that doesn't output anything
    pub fn quiet(name: &str, total: usize) -> Self {
        Self::with_bar(name, total, ProgressBar::hidden())
    }

    fn with_bar(name: &str, total: usize, bar: ProgressBar) -> Self {
        Self {
            name: name.to_string(),
            total,
            current: Arc::new(AtomicUsize::new(0)),
            succeeded: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Get the current progress count
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Number of successful DOIs so far
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Completed fraction
    pub fn fraction(&self) -> f64 {
        fraction(self.current(), self.total)
    }

    /// Check if the operation is complete
    pub fn is_done(&self) -> bool {
        self.total > 0 && self.current() >= self.total
    }

    /// Finish the progress bar with a one-line tally
    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        self.bar.finish_with_message(format!(
            "{}: {} of {} downloaded in {}s",
            self.name,
            self.succeeded(),
            self.total,
            elapsed.as_secs()
        ));
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("name", &self.name)
            .field("total", &self.total)
            .field("current", &self.current())
            .field("succeeded", &self.succeeded())
            .finish()
    }
}

impl ProgressSink for ProgressReporter {
    fn on_doi_start(&self, index: usize, total: usize, doi: &Doi) {
        self.bar
            .set_message(format!("{} ({}/{}: {})", self.name, index + 1, total, doi));
    }

    fn on_doi_done(&self, done: usize, _total: usize, _doi: &Doi, succeeded: bool) {
        self.current.store(done, Ordering::SeqCst);
        if succeeded {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        }
        self.bar.set_position(done as u64);
    }
}
