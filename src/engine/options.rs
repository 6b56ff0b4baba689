use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::compile::{DEFAULT_CACHE_SIZE, RULE_ID_OFFSET};
use crate::error::{BlocklistError, Result};
use crate::normalize::ExcludedDomains;

/// Feed polled when no other URL is configured
pub const DEFAULT_FEED_URL: &str =
    "https://minjust.gov.ru/ru/subscription/rss/extremist_materials/";

/// Default refresh interval: 720 minutes
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(720 * 60);

/// Number of rule ids that must fit above `rule_id_offset`
pub const MIN_RULE_ID_SPACE: u32 = 1 << 16;

/// Engine options.
///
/// Every field has a default, so a JSON options file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Feed document URL
    pub feed_url: String,
    /// Hosts that never become rules
    pub excluded_domains: ExcludedDomains,
    /// First rule id
    pub rule_id_offset: u32,
    /// LRU cache size for match verdicts
    pub cache_size: usize,
    /// How old the last update may get before `refresh_if_stale` refreshes
    #[serde(
        rename = "update_interval_minutes",
        serialize_with = "serialize_minutes",
        deserialize_with = "deserialize_minutes"
    )]
    pub update_interval: Duration,
    /// Keep the active rules when a feed yields no rules at all
    pub keep_rules_on_empty_feed: bool,
}

fn serialize_minutes<S: Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs() / 60)
}

fn deserialize_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    let minutes = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(minutes.saturating_mul(60)))
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            excluded_domains: ExcludedDomains::default(),
            rule_id_offset: RULE_ID_OFFSET,
            cache_size: DEFAULT_CACHE_SIZE,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            keep_rules_on_empty_feed: false,
        }
    }
}

impl EngineOptions {
    /// Create new engine options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            BlocklistError::Config(format!(
                "Failed to read options file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Check that the options describe a usable engine.
    pub fn validate(&self) -> Result<()> {
        if self.feed_url.trim().is_empty() {
            return Err(BlocklistError::Config("feed_url is empty".to_string()));
        }
        if self.rule_id_offset.checked_add(MIN_RULE_ID_SPACE - 1).is_none() {
            return Err(BlocklistError::Config(format!(
                "rule_id_offset {} leaves room for fewer than {} rules",
                self.rule_id_offset, MIN_RULE_ID_SPACE
            )));
        }
        if self.update_interval.is_zero() {
            return Err(BlocklistError::Config(
                "update interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the feed URL.
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }

    /// Replace the excluded domain set.
    pub fn with_excluded_domains(mut self, excluded: ExcludedDomains) -> Self {
        self.excluded_domains = excluded;
        self
    }

    /// Set the first rule id.
    pub fn with_rule_id_offset(mut self, offset: u32) -> Self {
        self.rule_id_offset = offset;
        self
    }

    /// Set cache size.
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set update interval.
    /// Default is 720 minutes (DEFAULT_UPDATE_INTERVAL)
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Keep the previous rules when a refresh finds nothing.
    pub fn with_keep_rules_on_empty_feed(mut self, keep: bool) -> Self {
        self.keep_rules_on_empty_feed = keep;
        self
    }
}
