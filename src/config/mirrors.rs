//! Mirror list handling.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Doi;

/// Mirrors used when none are configured
pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://sci-hub.box/",
    "https://sci-hub.se/",
    "https://sci-hub.wf/",
];

/// Maximum number of mirrors tried per DOI
pub const DEFAULT_MAX_MIRRORS: usize = 3;

/// A base URL that a DOI is appended to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mirror(String);

impl Mirror {
    /// Create a mirror, adding a trailing slash if missing
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim();
        if base.ends_with('/') {
            Self(base.to_string())
        } else {
            Self(format!("{}/", base))
        }
    }

    /// Base URL, always ending in `/`
    pub fn base_url(&self) -> &str {
        &self.0
    }

    /// Landing page URL for a DOI
    pub fn url_for(&self, doi: &Doi) -> String {
        format!("{}{}", self.0, doi)
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, deduplicated, capped list of mirrors. Order is attempt order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MirrorList {
    mirrors: Vec<Mirror>,
    truncated: bool,
}

impl MirrorList {
    /// Build a list from candidate base URLs.
    ///
    /// Blank entries are dropped and duplicates keep their first position.
    /// With nothing left the defaults are used. At most `max` mirrors are kept.
    pub fn build<I, S>(candidates: I, max: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mirrors: Vec<Mirror> = Vec::new();
        for candidate in candidates {
            let candidate = candidate.as_ref().trim();
            if candidate.is_empty() {
                continue;
            }
            let mirror = Mirror::new(candidate);
            if !mirrors.contains(&mirror) {
                mirrors.push(mirror);
            }
        }

        if mirrors.is_empty() {
            mirrors = DEFAULT_MIRRORS.iter().map(|m| Mirror::new(m)).collect();
        }

        let max = max.max(1);
        let truncated = mirrors.len() > max;
        mirrors.truncate(max);

        Self { mirrors, truncated }
    }

    /// The default mirrors
    pub fn defaults() -> Self {
        Self::build(DEFAULT_MIRRORS, DEFAULT_MAX_MIRRORS)
    }

    /// A list taken verbatim, without defaults or a cap
    pub fn exact<I, S>(base_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            mirrors: base_urls
                .into_iter()
                .map(|b| Mirror::new(b.as_ref()))
                .collect(),
            truncated: false,
        }
    }

    /// Whether mirrors were dropped to respect the cap
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mirror> {
        self.mirrors.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Mirror> {
        self.mirrors.get(index)
    }
}

impl<'a> IntoIterator for &'a MirrorList {
    type Item = &'a Mirror;
    type IntoIter = std::slice::Iter<'a, Mirror>;

    fn into_iter(self) -> Self::IntoIter {
        self.mirrors.iter()
    }
}
