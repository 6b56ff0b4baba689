use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use super::memory::apply_replace;
use super::{RuleStore, TimestampStore};
use crate::error::{BlocklistError, Result};
use crate::types::RuleRecord;

/// Write a file through a temporary sibling and rename it into place.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    let result = fs::File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.flush()
        })
        .and_then(|()| fs::rename(&tmp_path, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Rule store persisted as a JSON array of records.
pub struct JsonFileRuleStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRuleStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<RuleRecord>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl RuleStore for JsonFileRuleStore {
    fn list_active_rules(&self) -> Result<Vec<RuleRecord>> {
        let _lock = self.lock.lock();
        self.read()
    }

    fn replace_rules(&self, remove_ids: &[u32], add_rules: &[RuleRecord]) -> Result<()> {
        let _lock = self.lock.lock();
        let mut rules = self.read()?;
        apply_replace(&mut rules, remove_ids, add_rules)?;
        write_atomic(&self.path, &serde_json::to_vec_pretty(&rules)?)
    }
}

/// Timestamp slot persisted as unix seconds in a text file.
pub struct FileTimestampStore {
    path: PathBuf,
}

impl FileTimestampStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TimestampStore for FileTimestampStore {
    fn last_update(&self) -> Result<Option<SystemTime>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let secs: u64 = text.parse().map_err(|_| {
            BlocklistError::Storage(format!(
                "invalid timestamp '{}' in {}",
                text,
                self.path.display()
            ))
        })?;
        Ok(Some(UNIX_EPOCH + Duration::from_secs(secs)))
    }

    fn set_last_update(&self, at: SystemTime) -> Result<()> {
        let secs = at
            .duration_since(UNIX_EPOCH)
            .map_err(|_| BlocklistError::Storage("timestamp before unix epoch".to_string()))?
            .as_secs();
        write_atomic(&self.path, secs.to_string().as_bytes())
    }
}
