//! Candidate URL canonicalization.
//!
//! Turns one noisy candidate string into a [`NormalizedRule`], or rejects it
//! as malformed or as belonging to an excluded domain.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BlocklistError, Result};
use crate::types::NormalizedRule;

/// Hosts that never become block targets unless configured otherwise:
/// the feed's own publisher and one social network.
pub const DEFAULT_EXCLUDED_DOMAINS: &[&str] = &["minjust.gov.ru", "vk.com"];

/// Any explicit `scheme://` prefix
static SCHEME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://")
        .expect("SCHEME_PATTERN: hardcoded regex is invalid")
});

/// Percent-encoded slash
static SLASH_ESCAPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%2[fF]").expect("SLASH_ESCAPE_PATTERN: hardcoded regex is invalid"));

/// Set of hostnames excluded from blocking. Membership is exact on the
/// canonical host (lowercase, no leading "www.").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExcludedDomains {
    domains: HashSet<String>,
}

impl ExcludedDomains {
    /// Create a set from the given hostnames; each one is canonicalized.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for domain in domains {
            set.insert(domain.as_ref());
        }
        set
    }

    /// Create a set that excludes nothing.
    pub fn empty() -> Self {
        Self {
            domains: HashSet::new(),
        }
    }

    pub fn insert(&mut self, domain: &str) {
        let host = canonical_host(domain.trim());
        if !host.is_empty() {
            self.domains.insert(host);
        }
    }

    /// Check a canonical host for membership
    pub fn contains(&self, host: &str) -> bool {
        self.domains.contains(host)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl Default for ExcludedDomains {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_DOMAINS)
    }
}

impl From<Vec<String>> for ExcludedDomains {
    fn from(domains: Vec<String>) -> Self {
        Self::new(domains)
    }
}

impl From<ExcludedDomains> for Vec<String> {
    fn from(set: ExcludedDomains) -> Self {
        let mut domains: Vec<String> = set.domains.into_iter().collect();
        domains.sort();
        domains
    }
}

/// Lowercase a host, drop every leading "www." and a trailing root dot.
pub fn canonical_host(host: &str) -> String {
    let mut host = host.to_lowercase();
    let mut start = 0;
    while host[start..].starts_with("www.") {
        start += "www.".len();
    }
    let mut host = host.split_off(start);
    while host.ends_with('.') {
        host.pop();
    }
    host
}

fn is_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-.~:/?#[]@!$&'()*+,;=%".contains(c)
}

/// Strip trailing characters that cannot end a URL cited in prose.
///
/// Repeats until nothing changes: drops characters outside the URL
/// character class, then trailing closers and punctuation (`)` `]` `,` `;`
/// `.`).
pub fn strip_trailing_noise(s: &str) -> &str {
    let mut s = s;
    loop {
        let before = s.len();

        s = s.trim_end_matches(|c: char| !is_url_char(c));
        s = s.trim_end_matches([')', ']', ',', ';', '.']);

        if s.len() == before {
            return s;
        }
    }
}

/// Bring a path + query tail to a fixed point of trailing-slash and
/// trailing-noise stripping.
fn canonical_tail(path: &str, query: &str) -> String {
    let mut tail = format!("{}{}", path.trim_end_matches('/'), query);
    loop {
        let before = tail.len();

        let kept = strip_trailing_noise(&tail).len();
        tail.truncate(kept);
        if !tail.contains('?') {
            while tail.ends_with('/') {
                tail.pop();
            }
        }
        if tail.ends_with('?') {
            tail.pop();
        }

        if tail.len() == before {
            return tail;
        }
    }
}

fn has_web_scheme(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Normalize one raw candidate into a block rule.
///
/// Returns [`BlocklistError::MalformedUrl`] when the candidate cannot be
/// parsed as a web URL, and [`BlocklistError::ExcludedDomain`] when its host
/// is in `excluded`.
pub fn normalize_url(raw: &str, excluded: &ExcludedDomains) -> Result<NormalizedRule> {
    let cleaned: String = strip_trailing_noise(raw.trim())
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(BlocklistError::malformed(raw, "empty candidate"));
    }

    let with_scheme = if has_web_scheme(&cleaned) || SCHEME_PATTERN.is_match(&cleaned) {
        cleaned
    } else {
        format!("https://{}", cleaned)
    };
    let decoded = SLASH_ESCAPE_PATTERN.replace_all(&with_scheme, "/");

    let url = Url::parse(&decoded).map_err(|e| BlocklistError::malformed(raw, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BlocklistError::malformed(
            raw,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    let host = url
        .host_str()
        .map(canonical_host)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| BlocklistError::malformed(raw, "missing host"))?;

    if excluded.contains(&host) {
        return Err(BlocklistError::ExcludedDomain(host));
    }

    let path = url.path();
    let query = match url.query() {
        Some(q) if !q.is_empty() => format!("?{}", q),
        _ => String::new(),
    };

    let has_meaningful_path = path != "/" || !query.is_empty();
    if !has_meaningful_path {
        return Ok(NormalizedRule::domain_only(host));
    }

    Ok(NormalizedRule::with_tail(host, &canonical_tail(path, &query)))
}
