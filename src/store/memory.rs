use std::collections::HashSet;
use std::time::SystemTime;

use parking_lot::Mutex;

use super::{RuleStore, TimestampStore};
use crate::error::{BlocklistError, Result};
use crate::types::RuleRecord;

/// In-memory rule store.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: Mutex<Vec<RuleRecord>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with records.
    pub fn with_rules(rules: Vec<RuleRecord>) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }
}

/// Apply a removal followed by an addition, rejecting duplicate ids.
pub(super) fn apply_replace(
    rules: &mut Vec<RuleRecord>,
    remove_ids: &[u32],
    add_rules: &[RuleRecord],
) -> Result<()> {
    let remove: HashSet<u32> = remove_ids.iter().copied().collect();
    let mut next: Vec<RuleRecord> = rules
        .iter()
        .filter(|r| !remove.contains(&r.id))
        .cloned()
        .collect();

    let mut ids: HashSet<u32> = next.iter().map(|r| r.id).collect();
    for record in add_rules {
        if !ids.insert(record.id) {
            return Err(BlocklistError::Storage(format!(
                "rule id {} is already in use",
                record.id
            )));
        }
        next.push(record.clone());
    }

    *rules = next;
    Ok(())
}

impl RuleStore for MemoryRuleStore {
    fn list_active_rules(&self) -> Result<Vec<RuleRecord>> {
        Ok(self.rules.lock().clone())
    }

    fn replace_rules(&self, remove_ids: &[u32], add_rules: &[RuleRecord]) -> Result<()> {
        let mut rules = self.rules.lock();
        apply_replace(&mut rules, remove_ids, add_rules)
    }
}

/// Rule store that holds nothing and accepts every change.
#[derive(Debug, Default)]
pub struct NilRuleStore;

impl NilRuleStore {
    pub fn new() -> Self {
        Self
    }
}

impl RuleStore for NilRuleStore {
    fn list_active_rules(&self) -> Result<Vec<RuleRecord>> {
        Ok(Vec::new())
    }

    fn replace_rules(&self, _remove_ids: &[u32], _add_rules: &[RuleRecord]) -> Result<()> {
        Ok(())
    }
}

/// In-memory timestamp slot.
#[derive(Debug, Default)]
pub struct MemoryTimestampStore {
    last_update: Mutex<Option<SystemTime>>,
}

impl MemoryTimestampStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimestampStore for MemoryTimestampStore {
    fn last_update(&self) -> Result<Option<SystemTime>> {
        Ok(*self.last_update.lock())
    }

    fn set_last_update(&self, at: SystemTime) -> Result<()> {
        *self.last_update.lock() = Some(at);
        Ok(())
    }
}
