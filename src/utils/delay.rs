//! Pacing between mirror attempts.
//!
//! A pause is taken only between two mirror attempts for the same DOI, never
//! before the first one and never around the open-access lookup. The pause
//! belongs to a single fallback chain, not to the process.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Longest pause allowed between two mirrors, in seconds
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Inclusive range of seconds to wait between mirrors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    /// Create a range, swapping the bounds if given in reverse
    /// and clamping negatives to zero
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let (lo, hi) = if min_secs <= max_secs {
            (min_secs, max_secs)
        } else {
            (max_secs, min_secs)
        };
        Self {
            min_secs: lo.max(0.0),
            max_secs: hi.max(0.0),
        }
    }

    /// Draw a duration uniformly from the range.
    ///
    /// Bounds are clamped to `0..=MAX_DELAY_SECS` first; NaN counts as zero.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = clamp_secs(self.min_secs);
        let hi = clamp_secs(self.max_secs);
        let secs = if hi > lo {
            rng.random_range(lo..=hi)
        } else {
            lo
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

fn clamp_secs(secs: f64) -> f64 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_DELAY_SECS)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_secs: 3.0,
            max_secs: 7.0,
        }
    }
}

/// Something that can pause a fallback chain before its next mirror
#[async_trait]
pub trait DelayScheduler: Send + Sync + std::fmt::Debug {
    /// Block until the next mirror may be tried; returns how long was waited
    async fn pause(&self) -> Duration;
}

/// Sleeps for a random duration drawn from a [`DelayRange`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDelay {
    range: DelayRange,
}

impl RandomDelay {
    pub fn new(range: DelayRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> DelayRange {
        self.range
    }
}

#[async_trait]
impl DelayScheduler for RandomDelay {
    async fn pause(&self) -> Duration {
        let delay = self.range.sample(&mut rand::rng());
        tracing::info!(
            "Waiting {:.2} seconds before next mirror...",
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
        delay
    }
}

/// Never waits. Counts how often it was asked to.
#[derive(Debug, Default)]
pub struct NoDelay {
    pauses: AtomicUsize,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pauses requested so far
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DelayScheduler for NoDelay {
    async fn pause(&self) -> Duration {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Duration::ZERO
    }
}
