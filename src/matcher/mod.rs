mod domain;
mod prefix;

pub use domain::DomainIndex;
pub use prefix::{matches_prefix, strip_web_scheme};

use url::Url;

use crate::error::{BlocklistError, Result};
use crate::normalize::canonical_host;
use crate::types::{NormalizedRule, RuleTarget};

/// A query URL prepared for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUrl<'a> {
    /// The URL exactly as the caller supplied it
    pub raw: &'a str,
    /// Lowercased host without leading "www."
    pub host: String,
}

impl<'a> QueryUrl<'a> {
    /// Parse a query URL. Relative or otherwise unparseable URLs fail with
    /// [`BlocklistError::QueryParse`].
    pub fn parse(raw: &'a str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| BlocklistError::QueryParse {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        let host = url.host_str().map(canonical_host).unwrap_or_default();
        Ok(Self { raw, host })
    }
}

/// Trait for URL matchers
pub trait UrlMatcher: Send + Sync {
    /// Check if the query URL is blocked by this matcher
    fn matches(&self, query: &QueryUrl<'_>) -> bool;
}

impl UrlMatcher for NormalizedRule {
    fn matches(&self, query: &QueryUrl<'_>) -> bool {
        match self.target() {
            RuleTarget::DomainOnly { domain } => {
                (!query.host.is_empty() && query.host == *domain)
                    || matches_prefix(query.raw, self.match_prefix())
            }
            RuleTarget::PathQualified { .. } => matches_prefix(query.raw, self.match_prefix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked(rule: &NormalizedRule, url: &str) -> bool {
        rule.matches(&QueryUrl::parse(url).unwrap())
    }

    #[test]
    fn test_query_url_host() {
        let query = QueryUrl::parse("https://WWW.Example.org/x").unwrap();
        assert_eq!(query.host, "example.org");
        assert_eq!(query.raw, "https://WWW.Example.org/x");
    }

    #[test]
    fn test_query_url_parse_error() {
        let err = QueryUrl::parse("/relative/path").unwrap_err();
        assert!(matches!(err, BlocklistError::QueryParse { .. }));
    }

    #[test]
    fn test_path_qualified_prefix_semantics() {
        let rule = NormalizedRule::parse("||a.com/x").unwrap();
        assert!(blocked(&rule, "https://a.com/x"));
        assert!(blocked(&rule, "http://a.com/x"));
        assert!(blocked(&rule, "https://www.a.com/x"));
        assert!(blocked(&rule, "https://a.com/xyz"));
        assert!(blocked(&rule, "https://a.com/x/extra?q=1"));
        assert!(!blocked(&rule, "https://b.com/x"));
        assert!(!blocked(&rule, "https://a.com/"));
        assert!(!blocked(&rule, "https://sub.a.com/x"));
        assert!(!blocked(&rule, "ftp://a.com/x"));
    }

    #[test]
    fn test_domain_only_rule() {
        let rule = NormalizedRule::domain_only("a.com");
        assert!(blocked(&rule, "https://a.com/"));
        assert!(blocked(&rule, "https://www.a.com/any/path"));
        assert!(blocked(&rule, "HTTPS://A.COM/"));
        assert!(blocked(&rule, "http://a.com:8080/"));
        assert!(!blocked(&rule, "https://sub.a.com/"));
        assert!(!blocked(&rule, "https://b.com/?ref=a.com"));
    }

    #[test]
    fn test_domain_only_prefix_is_loose() {
        // The prefix test does not stop at a host boundary.
        let rule = NormalizedRule::domain_only("a.com");
        assert!(blocked(&rule, "https://a.com.mirror.net/"));
    }
}
