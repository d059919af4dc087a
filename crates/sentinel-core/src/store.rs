//! Key-value continuity store.
//!
//! Scheduler due-time and session metrics survive reloads through this
//! port. The store is a client-side continuity aid keyed by fixed string
//! identifiers; it is never authoritative over the backend's own state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::CoreError;

pub const KEY_SCAN_NEXT_RUN_AT: &str = "sentinel.scan.next_run_at";
pub const KEY_SCAN_BOOTSTRAPPED: &str = "sentinel.scan.bootstrapped";
pub const KEY_METRICS_COUNTERS: &str = "sentinel.metrics.counters";
pub const KEY_METRICS_SNAPSHOT: &str = "sentinel.metrics.snapshot";

pub trait StateStore: Send {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&mut self, key: &str) -> Result<(), CoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Single JSON object on disk; every save rewrites the file. Small state,
/// no contention: one session owns one store.
#[derive(Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(error) => {
                return Err(CoreError::persistence(format!(
                    "failed to read state file '{}': {error}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&raw).map_err(|error| {
            CoreError::persistence(format!(
                "failed to parse state file '{}': {error}",
                self.path.display()
            ))
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), CoreError> {
        let rendered = serde_json::to_string_pretty(entries).map_err(|error| {
            CoreError::persistence(format!("failed to render state file: {error}"))
        })?;
        std::fs::write(&self.path, rendered).map_err(|error| {
            CoreError::persistence(format!(
                "failed to write state file '{}': {error}",
                self.path.display()
            ))
        })
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_entries(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
