//! DOI normalization and input list parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolver prefix stripped from user-supplied DOIs
pub const DOI_RESOLVER_PREFIX: &str = "https://doi.org/";

/// A normalized Digital Object Identifier.
///
/// Never carries the resolver prefix, surrounding whitespace or surrounding
/// double quotes. The identifier is otherwise used verbatim: it is appended
/// to mirror base URLs and, after slash substitution, names the output file.
/// No shape validation happens here; malformed DOIs surface as fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Doi(String);

impl Doi {
    /// Normalize raw user input into a DOI.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim().trim_matches('"').trim();
        let stripped = trimmed
            .strip_prefix(DOI_RESOLVER_PREFIX)
            .unwrap_or(trimmed)
            .trim();
        Self(stripped.to_string())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether normalization left nothing behind
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Filesystem-safe stem: slashes and backslashes become underscores
    pub fn file_stem(&self) -> String {
        self.0.replace(['/', '\\'], "_")
    }

    /// Output file name for this DOI's PDF
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.file_stem())
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Doi {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl AsRef<str> for Doi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split an uploaded DOI list into entries.
///
/// Entries are separated by commas or line breaks, may be wrapped in double
/// quotes, and keep their input order. Blank entries are dropped.
pub fn parse_doi_list(content: &str) -> Vec<String> {
    content
        .split([',', '\n', '\r'])
        .map(|entry| entry.trim().trim_matches('"').trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefix_and_whitespace() {
        assert_eq!(Doi::normalize("  10.1/x  ").as_str(), "10.1/x");
        assert_eq!(Doi::normalize("https://doi.org/10.1/x").as_str(), "10.1/x");
        assert_eq!(Doi::normalize(" \"https://doi.org/10.1/x\" ").as_str(), "10.1/x");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = Doi::normalize("https://doi.org/10.1038/nature14539");
        let twice = Doi::normalize(once.as_str());
        assert_eq!(once, twice);
        assert_eq!(Doi::normalize("https://doi.org/10.1/x"), Doi::normalize("10.1/x"));
    }

    #[test]
    fn test_normalize_keeps_malformed_input() {
        // Not a DOI shape, still passed through
        assert_eq!(Doi::normalize("not-a-doi").as_str(), "not-a-doi");
        // Only the https resolver prefix is recognized
        assert_eq!(
            Doi::normalize("http://dx.doi.org/10.1/x").as_str(),
            "http://dx.doi.org/10.1/x"
        );
    }

    #[test]
    fn test_file_name_sanitizes_separators() {
        let doi = Doi::normalize("10.1000/abc\\def/ghi");
        assert_eq!(doi.file_stem(), "10.1000_abc_def_ghi");
        assert_eq!(doi.file_name(), "10.1000_abc_def_ghi.pdf");
    }

    #[test]
    fn test_parse_doi_list() {
        let list = parse_doi_list("10.1/AAA, \"10.1/BBB\",, https://doi.org/10.1/CCC\n10.1/DDD\n");
        assert_eq!(
            list,
            vec!["10.1/AAA", "10.1/BBB", "https://doi.org/10.1/CCC", "10.1/DDD"]
        );
    }

    #[test]
    fn test_parse_doi_list_empty() {
        assert!(parse_doi_list("").is_empty());
        assert!(parse_doi_list(" , ,\n").is_empty());
    }

    #[test]
    fn test_serde_transparent() {
        let doi = Doi::normalize("10.1/x");
        assert_eq!(serde_json::to_string(&doi).unwrap(), "\"10.1/x\"");
    }
}
