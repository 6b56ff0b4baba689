//! URL Blocklist - a feed-driven URL blocklist engine for Rust
//!
//! This library keeps a live set of block rules compiled from a periodically
//! fetched RSS feed and answers "is this URL blocked?" queries:
//! - Extraction of candidate URLs from `<link>` and `<description>` elements
//! - Normalization into canonical `||domain[/path][?query]` patterns
//! - Excluded domains that never become rules
//! - Deduplicated, id-assigned rule generations swapped in as a unit
//! - Domain and prefix matching with an LRU verdict cache
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use url_blocklist_r::{BlocklistEngine, EngineOptions, StaticFeedFetcher};
//!
//! let feed = r#"
//! <item>
//!   <link>https://example.org/page</link>
//!   <description>mirror: http://mirror.example.net/, see also https://www.blocked.example/</description>
//! </item>
//! "#;
//!
//! let engine = BlocklistEngine::new(EngineOptions::default())
//!     .with_fetcher(Arc::new(StaticFeedFetcher::new(feed)));
//! engine.refresh().unwrap();
//!
//! assert_eq!(
//!     engine.get_active_rules(),
//!     vec!["||example.org/page", "||mirror.example.net", "||blocked.example"]
//! );
//! assert!(engine.match_url("https://www.example.org/page/2"));
//! assert!(engine.match_url("http://mirror.example.net/anything"));
//! assert!(!engine.match_url("https://example.org/"));
//! ```
//!
//! # Rule Syntax
//!
//! | Pattern | Blocks |
//! |---------|--------|
//! | `\|\|example.org` | `example.org` and `www.example.org`, any path |
//! | `\|\|example.org/page` | every URL starting with `example.org/page` after the scheme and optional `www.` |
//! | `\|\|example.org?id=5` | every URL starting with `example.org?id=5` after the scheme and optional `www.` |
//!
//! Path-qualified rules are prefixes: `||example.org/page` also blocks
//! `example.org/pages` and `example.org/page/extra`.

pub mod compile;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod matcher;
pub mod normalize;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use compile::{
    compile, compile_feed, CompileReport, RuleEntry, RuleSet, DEFAULT_CACHE_SIZE, RULE_ID_OFFSET,
};
pub use engine::{
    BlocklistEngine, EngineOptions, EngineStatus, Generation, RefreshOutcome, RefreshSummary,
    DEFAULT_FEED_URL, DEFAULT_UPDATE_INTERVAL, MIN_RULE_ID_SPACE,
};
#[cfg(feature = "async")]
pub use engine::spawn_periodic_refresh;
pub use error::{BlocklistError, NetworkErrorKind, Result};
pub use extract::extract_candidates;
pub use fetch::{FeedFetcher, HttpFeedFetcher, StaticFeedFetcher};
pub use matcher::{QueryUrl, UrlMatcher};
pub use normalize::{normalize_url, ExcludedDomains, DEFAULT_EXCLUDED_DOMAINS};
pub use store::{
    FileTimestampStore, JsonFileRuleStore, MemoryRuleStore, MemoryTimestampStore, NilRuleStore,
    RuleStore, TimestampStore,
};
pub use types::{
    NormalizedRule, RawCandidate, ResourceType, RuleAction, RuleRecord, RuleTarget, SourceContext,
};
