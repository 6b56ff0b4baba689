use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BlocklistError, Result};

/// Domain-anchor marker that starts every rule pattern
pub const PATTERN_ANCHOR: &str = "||";

/// Priority assigned to every compiled rule
pub const RULE_PRIORITY: u32 = 1;

/// Maximum query length shown by [`NormalizedRule::display_url`]
const DISPLAY_QUERY_MAX: usize = 30;

/// Textual context a candidate URL was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceContext {
    /// Body of a `<link>` element
    Link,
    /// Free text inside a `<description>` element
    Description,
}

/// A URL-like substring extracted from feed text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCandidate<'a> {
    pub text: &'a str,
    pub context: SourceContext,
}

impl<'a> RawCandidate<'a> {
    pub fn new(text: &'a str, context: SourceContext) -> Self {
        Self { text, context }
    }
}

/// What a rule blocks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    /// Blocks an entire host
    DomainOnly { domain: String },
    /// Blocks a resource and every URL it is a prefix of
    PathQualified {
        domain: String,
        path: Option<String>,
        query: Option<String>,
    },
}

impl RuleTarget {
    pub fn domain(&self) -> &str {
        match self {
            RuleTarget::DomainOnly { domain } => domain,
            RuleTarget::PathQualified { domain, .. } => domain,
        }
    }
}

/// A canonical block pattern of the form `||domain[/path][?query]`.
///
/// The pattern string and the structured target are always kept in sync;
/// two rules are equal exactly when their patterns are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedRule {
    pattern: String,
    target: RuleTarget,
}

impl NormalizedRule {
    /// Create a rule blocking a whole domain.
    ///
    /// `domain` must already be canonical (lowercase, no leading "www.").
    pub fn domain_only(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            pattern: format!("{PATTERN_ANCHOR}{domain}"),
            target: RuleTarget::DomainOnly { domain },
        }
    }

    /// Create a rule from a canonical domain and a path/query tail.
    ///
    /// An empty tail yields a domain-only rule.
    pub fn with_tail(domain: impl Into<String>, tail: &str) -> Self {
        let domain = domain.into();
        if tail.is_empty() {
            return Self::domain_only(domain);
        }

        let (path, query) = match tail.find('?') {
            Some(pos) => (&tail[..pos], Some(tail[pos..].to_string())),
            None => (tail, None),
        };
        let path = (!path.is_empty()).then(|| path.to_string());

        Self {
            pattern: format!("{PATTERN_ANCHOR}{domain}{tail}"),
            target: RuleTarget::PathQualified {
                domain,
                path,
                query,
            },
        }
    }

    /// Parse a pattern string back into its structured form.
    pub fn parse(pattern: &str) -> Result<Self> {
        let body = pattern
            .strip_prefix(PATTERN_ANCHOR)
            .ok_or_else(|| BlocklistError::InvalidPattern(format!("missing anchor: {}", pattern)))?;

        let split = body.find(['/', '?']).unwrap_or(body.len());
        let (domain, tail) = body.split_at(split);

        if domain.is_empty() {
            return Err(BlocklistError::InvalidPattern(format!(
                "empty domain: {}",
                pattern
            )));
        }
        if domain.starts_with("www.") || domain.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(BlocklistError::InvalidPattern(format!(
                "non-canonical domain: {}",
                pattern
            )));
        }
        let path = tail.split('?').next().unwrap_or_default();
        if path.ends_with('/') {
            return Err(BlocklistError::InvalidPattern(format!(
                "trailing slash: {}",
                pattern
            )));
        }

        Ok(Self::with_tail(domain, tail))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    pub fn domain(&self) -> &str {
        self.target.domain()
    }

    pub fn path(&self) -> Option<&str> {
        match &self.target {
            RuleTarget::DomainOnly { .. } => None,
            RuleTarget::PathQualified { path, .. } => path.as_deref(),
        }
    }

    pub fn query(&self) -> Option<&str> {
        match &self.target {
            RuleTarget::DomainOnly { .. } => None,
            RuleTarget::PathQualified { query, .. } => query.as_deref(),
        }
    }

    pub fn is_domain_only(&self) -> bool {
        matches!(self.target, RuleTarget::DomainOnly { .. })
    }

    /// The literal text a matching URL must continue with after its
    /// scheme and optional "www." (`domain[/path][?query]`).
    pub fn match_prefix(&self) -> &str {
        &self.pattern[PATTERN_ANCHOR.len()..]
    }

    /// The https URL this rule was derived from.
    pub fn implied_url(&self) -> String {
        format!("https://{}", self.match_prefix())
    }

    /// Short human-readable form for rule listings. Long queries are cut
    /// to 30 characters followed by "...".
    pub fn display_url(&self) -> String {
        let mut out = self.domain().to_string();
        match (self.path(), self.query()) {
            (Some(path), _) => out.push_str(path),
            (None, Some(_)) => out.push('/'),
            (None, None) => {}
        }
        if let Some(query) = self.query() {
            if query.chars().count() > DISPLAY_QUERY_MAX {
                out.extend(query.chars().take(DISPLAY_QUERY_MAX));
                out.push_str("...");
            } else {
                out.push_str(query);
            }
        }
        out
    }
}

impl fmt::Display for NormalizedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Action applied by a rule record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
}

/// Request type a rule record applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
}

/// Rule shape handed to the rule-storage substrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub pattern: String,
    pub applies_to: Vec<ResourceType>,
}

impl RuleRecord {
    /// Create a main-frame block record.
    pub fn block(id: u32, pattern: impl Into<String>) -> Self {
        Self {
            id,
            priority: RULE_PRIORITY,
            action: RuleAction::Block,
            pattern: pattern.into(),
            applies_to: vec![ResourceType::MainFrame],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_only_rule() {
        let rule = NormalizedRule::domain_only("example.org");
        assert_eq!(rule.pattern(), "||example.org");
        assert_eq!(rule.domain(), "example.org");
        assert!(rule.is_domain_only());
        assert!(rule.path().is_none());
        assert!(rule.query().is_none());
    }

    #[test]
    fn test_with_tail_splits_path_and_query() {
        let rule = NormalizedRule::with_tail("example.org", "/a/b?x=1");
        assert_eq!(rule.pattern(), "||example.org/a/b?x=1");
        assert_eq!(rule.path(), Some("/a/b"));
        assert_eq!(rule.query(), Some("?x=1"));
        assert!(!rule.is_domain_only());

        let rule = NormalizedRule::with_tail("example.org", "?x=1");
        assert_eq!(rule.path(), None);
        assert_eq!(rule.query(), Some("?x=1"));

        let rule = NormalizedRule::with_tail("example.org", "");
        assert!(rule.is_domain_only());
    }

    #[test]
    fn test_parse_pattern() {
        let rule = NormalizedRule::parse("||sub.example.org/a/b").unwrap();
        assert_eq!(rule.domain(), "sub.example.org");
        assert_eq!(rule.path(), Some("/a/b"));
        assert_eq!(rule, NormalizedRule::with_tail("sub.example.org", "/a/b"));

        let rule = NormalizedRule::parse("||example.org").unwrap();
        assert!(rule.is_domain_only());
    }

    #[test]
    fn test_parse_rejects_invalid_patterns() {
        assert!(NormalizedRule::parse("example.org").is_err());
        assert!(NormalizedRule::parse("||").is_err());
        assert!(NormalizedRule::parse("||/path").is_err());
        assert!(NormalizedRule::parse("||www.example.org").is_err());
        assert!(NormalizedRule::parse("||Example.org").is_err());
        assert!(NormalizedRule::parse("||example.org/a/").is_err());
        assert!(NormalizedRule::parse("||example.org/a/?q=1").is_err());
        assert!(NormalizedRule::parse("||example.org/a?q=1/").is_ok());
    }

    #[test]
    fn test_match_prefix_and_implied_url() {
        let rule = NormalizedRule::with_tail("a.com", "/x");
        assert_eq!(rule.match_prefix(), "a.com/x");
        assert_eq!(rule.implied_url(), "https://a.com/x");
    }

    #[test]
    fn test_display_url_truncates_long_query() {
        let rule = NormalizedRule::with_tail("a.com", "/search?q=0123456789012345678901234567890123");
        assert_eq!(rule.display_url(), "a.com/search?q=012345678901234567890123456...");

        let rule = NormalizedRule::with_tail("a.com", "?id=7");
        assert_eq!(rule.display_url(), "a.com/?id=7");

        let rule = NormalizedRule::domain_only("a.com");
        assert_eq!(rule.display_url(), "a.com");
    }

    #[test]
    fn test_rule_record_serialization() {
        let record = RuleRecord::block(1000, "||a.com/x");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 1000);
        assert_eq!(json["priority"], 1);
        assert_eq!(json["action"], "block");
        assert_eq!(json["pattern"], "||a.com/x");
        assert_eq!(json["appliesTo"][0], "main_frame");

        let back: RuleRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
