//! Feed text scanning.
//!
//! Pulls candidate URLs out of an RSS document from two places: the body of
//! `<link>` elements and the free text of `<description>` elements.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{RawCandidate, SourceContext};

/// A `<link>` element holding a single absolute URL
static LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<link>(https?://[^\s<]*)</link>")
        .expect("LINK_PATTERN: hardcoded regex is invalid")
});

/// A `<description>` element, possibly spanning several lines
static DESCRIPTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<description>(.*?)</description>")
        .expect("DESCRIPTION_PATTERN: hardcoded regex is invalid")
});

/// An http(s) URL embedded in prose, ending at whitespace, a quote or an angle bracket
static TEXT_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s"<>]+"#)
        .expect("TEXT_URL_PATTERN: hardcoded regex is invalid")
});

/// Extract every candidate URL from feed text.
///
/// All `<link>` candidates come first in document order, followed by all
/// `<description>` candidates in document order. Duplicates are kept.
pub fn extract_candidates(text: &str) -> Vec<RawCandidate<'_>> {
    let mut candidates = extract_links(text);
    candidates.extend(extract_description_urls(text));
    candidates
}

/// Candidates from `<link>` elements.
pub fn extract_links(text: &str) -> Vec<RawCandidate<'_>> {
    LINK_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| RawCandidate::new(m.as_str(), SourceContext::Link))
        .collect()
}

/// Candidates from the text of `<description>` elements.
pub fn extract_description_urls(text: &str) -> Vec<RawCandidate<'_>> {
    DESCRIPTION_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|block| TEXT_URL_PATTERN.find_iter(block.as_str()))
        .map(|m| RawCandidate::new(m.as_str(), SourceContext::Description))
        .collect()
}
