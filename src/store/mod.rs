//! Rule and timestamp persistence.
//!
//! The engine talks to two storage collaborators: the rule-storage
//! substrate that enforces blocking, and a small key-value slot holding the
//! time of the last successful refresh.

mod file;
mod memory;

pub use file::{FileTimestampStore, JsonFileRuleStore};
pub use memory::{MemoryRuleStore, MemoryTimestampStore, NilRuleStore};

use std::time::SystemTime;

use crate::error::Result;
use crate::types::RuleRecord;

/// Rule-storage substrate interface.
///
/// Rules are never edited in place: every change is a removal of a set of
/// ids followed by the addition of complete records.
pub trait RuleStore: Send + Sync {
    /// List every rule currently installed.
    fn list_active_rules(&self) -> Result<Vec<RuleRecord>>;

    /// Remove the rules with `remove_ids`, then add `add_rules`.
    fn replace_rules(&self, remove_ids: &[u32], add_rules: &[RuleRecord]) -> Result<()>;
}

/// Last-update timestamp persistence interface.
pub trait TimestampStore: Send + Sync {
    /// Time of the last successful refresh, if any.
    fn last_update(&self) -> Result<Option<SystemTime>>;

    /// Record the time of a successful refresh.
    fn set_last_update(&self, at: SystemTime) -> Result<()>;
}
