use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;

use parking_lot::Mutex;

use lru::LruCache;

use crate::error::{BlocklistError, Result};
use crate::extract::extract_candidates;
use crate::matcher::{DomainIndex, QueryUrl, UrlMatcher};
use crate::normalize::{normalize_url, ExcludedDomains};
use crate::types::{NormalizedRule, RuleRecord};

/// First identifier handed out to compiled rules; lower ids are reserved
pub const RULE_ID_OFFSET: u32 = 1000;

/// Default LRU cache size for match verdicts
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// A rule together with its assigned identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub id: u32,
    pub rule: NormalizedRule,
}

impl RuleEntry {
    /// The record handed to the rule store for this entry
    pub fn record(&self) -> RuleRecord {
        RuleRecord::block(self.id, self.rule.pattern())
    }
}

/// One immutable generation of compiled rules with a verdict cache.
///
/// The cache belongs to the generation, so installing a new rule set
/// starts from a cold cache.
pub struct RuleSet {
    entries: Vec<RuleEntry>,
    domains: DomainIndex,
    cache: Mutex<LruCache<String, Option<u32>>>,
}

impl RuleSet {
    /// Create a rule set from entries that already carry their ids
    pub fn new(entries: Vec<RuleEntry>, cache_size: usize) -> Self {
        let mut domains = DomainIndex::new();
        for (position, entry) in entries.iter().enumerate() {
            if entry.rule.is_domain_only() {
                domains.insert(entry.rule.domain(), position);
            }
        }

        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries,
            domains,
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    /// The rule set active before the first build
    pub fn empty() -> Self {
        Self::new(Vec::new(), 1)
    }

    /// Rebuild a rule set from records previously handed to a rule store.
    pub fn from_records(records: &[RuleRecord], cache_size: usize) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            if !seen.insert(record.id) {
                return Err(BlocklistError::InvalidPattern(format!(
                    "duplicate rule id {} for {}",
                    record.id, record.pattern
                )));
            }
            entries.push(RuleEntry {
                id: record.id,
                rule: NormalizedRule::parse(&record.pattern)?,
            });
        }

        Ok(Self::new(entries, cache_size))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleEntry> {
        self.entries.iter()
    }

    /// Patterns in emission order
    pub fn patterns(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.rule.pattern().to_string())
            .collect()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn records(&self) -> Vec<RuleRecord> {
        self.entries.iter().map(RuleEntry::record).collect()
    }

    /// Find the rule blocking a query URL.
    ///
    /// The domain test and the prefix test both run against this one
    /// generation; the first hit wins.
    pub fn find_match(&self, query: &QueryUrl<'_>) -> Option<&RuleEntry> {
        if let Some(position) = self.domains.get(&query.host) {
            return self.entries.get(position);
        }
        self.entries.iter().find(|e| e.rule.matches(query))
    }

    /// Id of the rule blocking a query URL, consulting the verdict cache.
    pub fn match_query(&self, query: &QueryUrl<'_>) -> Option<u32> {
        if let Some(cached) = self.cache.lock().get(query.raw) {
            return *cached;
        }

        let verdict = self.find_match(query).map(|e| e.id);
        self.cache.lock().put(query.raw.to_string(), verdict);
        verdict
    }

    /// Check whether a URL is blocked by this rule set.
    pub fn is_blocked(&self, url: &str) -> Result<bool> {
        let query = QueryUrl::parse(url)?;
        Ok(self.match_query(&query).is_some())
    }

    /// Clear the verdict cache
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("entries", &self.entries)
            .field("domain_only", &self.domains.len())
            .finish()
    }
}

/// Outcome of compiling a whole feed
#[derive(Debug)]
pub struct CompileReport {
    pub rule_set: RuleSet,
    /// Candidates found by the extractor, duplicates included
    pub raw_candidates: usize,
    /// Candidates skipped because they could not be parsed
    pub malformed: usize,
    /// Candidates skipped because their host is excluded
    pub excluded: usize,
}

/// Compile normalized rules into a rule set.
///
/// Only the first occurrence of each pattern is kept; ids are assigned
/// sequentially from `id_offset` in the order rules are kept. Fails with
/// [`BlocklistError::Config`] when the kept rules do not fit in the id space
/// above `id_offset`.
pub fn compile<I>(rules: I, id_offset: u32, cache_size: usize) -> Result<RuleSet>
where
    I: IntoIterator<Item = NormalizedRule>,
{
    let mut seen = HashSet::new();
    let mut entries: Vec<RuleEntry> = Vec::new();

    for rule in rules {
        if !seen.insert(rule.pattern().to_string()) {
            continue;
        }
        let id = u32::try_from(entries.len())
            .ok()
            .and_then(|position| id_offset.checked_add(position))
            .ok_or_else(|| {
                BlocklistError::Config(format!(
                    "rule id offset {} leaves no room for rule {}",
                    id_offset,
                    entries.len() + 1
                ))
            })?;
        entries.push(RuleEntry { id, rule });
    }

    Ok(RuleSet::new(entries, cache_size))
}

/// Extract, normalize and compile every URL in a feed document.
pub fn compile_feed(
    text: &str,
    excluded: &ExcludedDomains,
    id_offset: u32,
    cache_size: usize,
) -> Result<CompileReport> {
    let candidates = extract_candidates(text);
    let raw_candidates = candidates.len();
    tracing::info!("Found {} raw URLs in feed", raw_candidates);

    let mut malformed = 0;
    let mut excluded_count = 0;
    let mut rules = Vec::with_capacity(raw_candidates);

    for candidate in candidates {
        match normalize_url(candidate.text, excluded) {
            Ok(rule) => rules.push(rule),
            Err(BlocklistError::ExcludedDomain(host)) => {
                tracing::debug!("Skipping excluded domain {}", host);
                excluded_count += 1;
            }
            Err(e) => {
                tracing::warn!(context = ?candidate.context, "Invalid URL skipped: {}", e);
                malformed += 1;
            }
        }
    }

    let rule_set = compile(rules, id_offset, cache_size)?;
    tracing::info!("Extracted {} unique blocking rules", rule_set.len());

    Ok(CompileReport {
        rule_set,
        raw_candidates,
        malformed,
        excluded: excluded_count,
    })
}
