//! Blocklist engine.
//!
//! Owns the active rule generation and the enabled flag, runs refreshes one
//! at a time, and answers match queries against a consistent snapshot.

mod options;
#[cfg(feature = "async")]
mod scheduler;

pub use options::{EngineOptions, DEFAULT_FEED_URL, DEFAULT_UPDATE_INTERVAL, MIN_RULE_ID_SPACE};
#[cfg(feature = "async")]
pub use scheduler::spawn_periodic_refresh;

use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::compile::{compile_feed, CompileReport, RuleSet};
use crate::error::Result;
use crate::fetch::{FeedFetcher, HttpFeedFetcher};
use crate::matcher::QueryUrl;
use crate::store::{MemoryRuleStore, MemoryTimestampStore, RuleStore, TimestampStore};

/// One complete rule set and the time it was built
#[derive(Debug, Default)]
pub struct Generation {
    pub rules: Arc<RuleSet>,
    pub built_at: Option<SystemTime>,
}

/// Counts from a completed refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    /// Rules active after the refresh
    pub rule_count: usize,
    pub raw_candidates: usize,
    pub malformed: usize,
    pub excluded: usize,
}

impl RefreshSummary {
    fn from_report(report: &CompileReport, rule_count: usize) -> Self {
        Self {
            rule_count,
            raw_candidates: report.raw_candidates,
            malformed: report.malformed,
            excluded: report.excluded,
        }
    }
}

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new generation was installed
    Updated(RefreshSummary),
    /// The feed had no usable URLs and the previous rules were kept
    KeptOnEmptyFeed(RefreshSummary),
    /// The engine is disabled; nothing was fetched
    SkippedDisabled,
}

/// Snapshot of the engine for status displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub enabled: bool,
    pub last_update: Option<SystemTime>,
    pub rule_count: usize,
    /// Active patterns in id order
    pub rules: Vec<String>,
}

struct EngineState {
    generation: Arc<Generation>,
    enabled: bool,
}

/// Feed-driven URL blocklist engine.
///
/// Starts enabled with an empty rule set. All collaborators default to the
/// HTTP fetcher and in-memory stores.
pub struct BlocklistEngine {
    options: EngineOptions,
    fetcher: Arc<dyn FeedFetcher>,
    rule_store: Arc<dyn RuleStore>,
    timestamps: Arc<dyn TimestampStore>,
    state: RwLock<EngineState>,
    refresh_lock: Mutex<()>,
}

impl BlocklistEngine {
    /// Create a new engine
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            fetcher: Arc::new(HttpFeedFetcher::new()),
            rule_store: Arc::new(MemoryRuleStore::new()),
            timestamps: Arc::new(MemoryTimestampStore::new()),
            state: RwLock::new(EngineState {
                generation: Arc::new(Generation::default()),
                enabled: true,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Set the feed fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn FeedFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Set the rule-storage substrate
    pub fn with_rule_store(mut self, store: Arc<dyn RuleStore>) -> Self {
        self.rule_store = store;
        self
    }

    /// Set the last-update persistence
    pub fn with_timestamp_store(mut self, store: Arc<dyn TimestampStore>) -> Self {
        self.timestamps = store;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    /// The generation currently answering queries
    pub fn generation(&self) -> Arc<Generation> {
        Arc::clone(&self.state.read().generation)
    }

    /// The active rule set
    pub fn active_rules(&self) -> Arc<RuleSet> {
        Arc::clone(&self.state.read().generation.rules)
    }

    /// Active patterns in id order
    pub fn get_active_rules(&self) -> Vec<String> {
        self.active_rules().patterns()
    }

    /// Time of the last successful refresh, as persisted.
    pub fn last_update(&self) -> Option<SystemTime> {
        match self.timestamps.last_update() {
            Ok(at) => at,
            Err(e) => {
                tracing::warn!("Failed to read last update time: {}", e);
                self.generation().built_at
            }
        }
    }

    pub fn status(&self) -> EngineStatus {
        let (enabled, rules) = {
            let state = self.state.read();
            (state.enabled, Arc::clone(&state.generation.rules))
        };
        EngineStatus {
            enabled,
            last_update: self.last_update(),
            rule_count: rules.len(),
            rules: rules.patterns(),
        }
    }

    /// Fetch the feed and install a freshly compiled generation.
    ///
    /// Waits for any refresh already in flight. On failure the active
    /// generation is left untouched.
    pub fn refresh(&self) -> Result<RefreshOutcome> {
        let _lock = self.refresh_lock.lock();
        self.refresh_locked()
    }

    /// Refresh only when the last update is older than the update interval.
    ///
    /// Returns `Ok(None)` when the rules are still fresh. A request queued
    /// behind a refresh that just finished sees the new timestamp and does
    /// nothing.
    pub fn refresh_if_stale(&self, now: SystemTime) -> Result<Option<RefreshOutcome>> {
        if !self.is_stale(now)? {
            return Ok(None);
        }

        let _lock = self.refresh_lock.lock();

        // Double-check after acquiring lock
        if !self.is_stale(now)? {
            return Ok(None);
        }

        self.refresh_locked().map(Some)
    }

    fn is_stale(&self, now: SystemTime) -> Result<bool> {
        Ok(match self.timestamps.last_update()? {
            None => true,
            // An update newer than `now` counts as fresh
            Some(at) => now
                .duration_since(at)
                .map(|age| age >= self.options.update_interval)
                .unwrap_or(false),
        })
    }

    fn refresh_locked(&self) -> Result<RefreshOutcome> {
        if !self.is_enabled() {
            tracing::info!("Engine disabled, refresh skipped");
            return Ok(RefreshOutcome::SkippedDisabled);
        }

        tracing::info!(feed = %self.options.feed_url, "Refreshing blocklist");
        let text = self.fetcher.fetch(&self.options.feed_url).map_err(|e| {
            tracing::error!("Feed fetch failed, keeping active rules: {}", e);
            e
        })?;

        let report = compile_feed(
            &text,
            &self.options.excluded_domains,
            self.options.rule_id_offset,
            self.options.cache_size,
        )?;

        let current = self.generation();
        if report.rule_set.is_empty()
            && !current.rules.is_empty()
            && self.options.keep_rules_on_empty_feed
        {
            tracing::warn!(
                "Feed yielded no rules, keeping {} active rules",
                current.rules.len()
            );
            return Ok(RefreshOutcome::KeptOnEmptyFeed(RefreshSummary::from_report(
                &report,
                current.rules.len(),
            )));
        }

        let summary = RefreshSummary::from_report(&report, report.rule_set.len());
        let built_at = SystemTime::now();
        self.install(Arc::new(report.rule_set), Some(built_at))?;

        if let Err(e) = self.timestamps.set_last_update(built_at) {
            tracing::warn!("Failed to persist last update time: {}", e);
        }

        tracing::info!("Installed {} blocking rules", summary.rule_count);
        Ok(RefreshOutcome::Updated(summary))
    }

    /// Replace every rule in the store, then swap the in-memory generation.
    ///
    /// Caller must hold `refresh_lock`. Readers keep seeing the previous
    /// generation until the swap.
    fn install(&self, rules: Arc<RuleSet>, built_at: Option<SystemTime>) -> Result<()> {
        let remove_ids: Vec<u32> = self
            .rule_store
            .list_active_rules()?
            .iter()
            .map(|r| r.id)
            .collect();

        self.rule_store.replace_rules(&remove_ids, &rules.records())?;
        tracing::debug!(
            removed = remove_ids.len(),
            added = rules.len(),
            "Rule store updated"
        );

        self.state.write().generation = Arc::new(Generation { rules, built_at });
        Ok(())
    }

    /// Enable or disable blocking.
    ///
    /// Disabling revokes every active rule without rebuilding; enabling
    /// triggers a refresh.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let _lock = self.refresh_lock.lock();

        if enabled {
            self.state.write().enabled = true;
            tracing::info!("Blocking enabled");
            return self.refresh_locked().map(|_| ());
        }

        let revoked = {
            let mut state = self.state.write();
            state.enabled = false;
            let revoked = state.generation.rules.len();
            let built_at = state.generation.built_at;
            state.generation = Arc::new(Generation {
                rules: Arc::new(RuleSet::empty()),
                built_at,
            });
            revoked
        };

        let remove_ids: Vec<u32> = self
            .rule_store
            .list_active_rules()?
            .iter()
            .map(|r| r.id)
            .collect();
        if !remove_ids.is_empty() {
            self.rule_store.replace_rules(&remove_ids, &[])?;
        }

        tracing::info!("Blocking disabled, revoked {} rules", revoked);
        Ok(())
    }

    /// Adopt the rules already present in the rule store as the active
    /// generation. Returns the number of rules adopted; a disabled engine
    /// adopts nothing.
    pub fn restore_from_store(&self) -> Result<usize> {
        let _lock = self.refresh_lock.lock();

        if !self.is_enabled() {
            tracing::info!("Engine disabled, restore skipped");
            return Ok(0);
        }

        let records = self.rule_store.list_active_rules()?;
        let rules = RuleSet::from_records(&records, self.options.cache_size)?;
        let built_at = self.timestamps.last_update()?;
        let count = rules.len();

        self.state.write().generation = Arc::new(Generation {
            rules: Arc::new(rules),
            built_at,
        });

        tracing::info!("Restored {} rules from store", count);
        Ok(count)
    }

    /// Check a URL, failing with [`crate::BlocklistError::QueryParse`] when
    /// it cannot be parsed.
    pub fn try_match_url(&self, url: &str) -> Result<bool> {
        let query = QueryUrl::parse(url)?;
        let rules = self.active_rules();
        match rules.match_query(&query) {
            Some(id) => {
                tracing::debug!(url, rule = id, "URL blocked");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Check a URL. Unparseable URLs are reported and treated as not
    /// blocked.
    pub fn match_url(&self, url: &str) -> bool {
        self.try_match_url(url).unwrap_or_else(|e| {
            tracing::warn!("Treating query as not blocked: {}", e);
            false
        })
    }
}

impl Default for BlocklistEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
