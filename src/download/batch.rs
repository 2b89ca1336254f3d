//! Batch orchestration over a DOI list.

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::models::{BatchResult, Doi};
use crate::utils::ProgressSink;

use super::{ChainOutcome, FallbackChain};

/// Runs the fallback chain for each DOI of a list, strictly in input order
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    chain: FallbackChain,
}

impl BatchProcessor {
    pub fn new(chain: FallbackChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Process every DOI and account for each exactly once.
    ///
    /// A panic while processing one DOI is recorded as a failure for that DOI
    /// and the batch moves on.
    pub async fn run(&self, raw_dois: &[String], progress: &dyn ProgressSink) -> BatchResult {
        let total = raw_dois.len();
        let mut result = BatchResult::new();

        for (index, raw) in raw_dois.iter().enumerate() {
            let doi = Doi::normalize(raw);
            progress.on_doi_start(index, total, &doi);
            tracing::info!("DOI {}/{}: {}", index + 1, total, doi);

            let outcome = AssertUnwindSafe(self.chain.run(&doi)).catch_unwind().await;
            let succeeded = match outcome {
                Ok(ChainOutcome::Succeeded(record)) => {
                    result.push_success(record);
                    true
                }
                Ok(ChainOutcome::Failed { attempts }) => {
                    result.push_failure(doi.clone(), attempts);
                    false
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!("Error processing DOI {}: {}", doi, message);
                    result.push_error(doi.clone(), message);
                    false
                }
            };

            progress.on_doi_done(index + 1, total, &doi, succeeded);
        }

        result.finished_at = chrono::Utc::now();
        tracing::info!(
            "Batch finished: {} of {} downloaded",
            result.success_count(),
            result.total()
        );
        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected panic".to_string()
    }
}
