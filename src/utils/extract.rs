//! PDF link extraction from mirror landing pages.
//!
//! Mirrors differ in markup, so extraction is a fixed priority list of
//! heuristics tried in order until one yields a link. Framed viewers come
//! first because they are the most reliable; bare download links come last.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single way of finding a PDF link in a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// `src` of the first `<iframe>`
    InlineFrame,
    /// `src` of the first `<embed>`
    Embed,
    /// First `<a>` whose `href` ends in `.pdf`
    PdfAnchor,
    /// First `<a>` with an `href` inside `<div id="download">`
    DownloadRegion,
}

impl Heuristic {
    /// All heuristics in priority order
    pub const PRIORITY: [Heuristic; 4] = [
        Heuristic::InlineFrame,
        Heuristic::Embed,
        Heuristic::PdfAnchor,
        Heuristic::DownloadRegion,
    ];

    /// Apply this heuristic to a parsed document
    pub fn extract(self, document: &Html) -> Option<String> {
        match self {
            Heuristic::InlineFrame => first_element_attr(document, "iframe", "src"),
            Heuristic::Embed => first_element_attr(document, "embed", "src"),
            Heuristic::PdfAnchor => {
                let selector = Selector::parse("a[href]").ok()?;
                document
                    .select(&selector)
                    .filter_map(|a| non_empty_attr(&a, "href"))
                    .find(|href| href.ends_with(".pdf"))
            }
            Heuristic::DownloadRegion => {
                let region_selector = Selector::parse("div#download").ok()?;
                let anchor_selector = Selector::parse("a").ok()?;
                let region = document.select(&region_selector).next()?;
                region
                    .select(&anchor_selector)
                    .find_map(|a| non_empty_attr(&a, "href"))
            }
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Heuristic::InlineFrame => "iframe",
            Heuristic::Embed => "embed",
            Heuristic::PdfAnchor => "pdf anchor",
            Heuristic::DownloadRegion => "download region",
        };
        f.write_str(name)
    }
}

/// Only the first matching element is considered; a missing or empty
/// attribute on it means no match.
fn first_element_attr(document: &Html, tag: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    let element = document.select(&selector).next()?;
    non_empty_attr(&element, attr)
}

fn non_empty_attr(element: &ElementRef, attr: &str) -> Option<String> {
    element
        .value()
        .attr(attr)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A link found in a page, tagged with the heuristic that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfCandidate {
    pub url: String,
    pub heuristic: Heuristic,
}

/// Runs heuristics in order and stops at the first match
#[derive(Debug, Clone)]
pub struct PdfLinkExtractor {
    heuristics: Vec<Heuristic>,
}

impl PdfLinkExtractor {
    /// Extractor using [`Heuristic::PRIORITY`]
    pub fn new() -> Self {
        Self::with_heuristics(Heuristic::PRIORITY.to_vec())
    }

    /// Extractor with a custom order
    pub fn with_heuristics(heuristics: Vec<Heuristic>) -> Self {
        Self { heuristics }
    }

    /// Heuristics in the order they are tried
    pub fn heuristics(&self) -> &[Heuristic] {
        &self.heuristics
    }

    /// Find at most one PDF candidate in an HTML body
    pub fn extract(&self, html: &str) -> Option<PdfCandidate> {
        let document = Html::parse_document(html);
        self.heuristics.iter().find_map(|&heuristic| {
            heuristic.extract(&document).map(|url| PdfCandidate { url, heuristic })
        })
    }
}

impl Default for PdfLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}
