//! Retrieval engine: the per-DOI fallback chain, batch orchestration and
//! packaging of the results.

mod batch;
mod chain;
mod output;
mod package;

pub use batch::BatchProcessor;
pub use chain::{ChainOutcome, ChainState, FallbackChain};
pub use output::OutputDir;
pub use package::{
    failure_manifest, summary, write_archive, write_failure_manifest, PackageError,
};
