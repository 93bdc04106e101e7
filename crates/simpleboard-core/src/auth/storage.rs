//! Key-value storage backing the session.
//!
//! The session never talks to a concrete store directly; it goes through
//! [`KeyValueStore`] so the same logic runs against the on-disk store used by
//! the CLI and the in-memory store used for transient values and tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// A flat string-to-string store with no multi-key atomicity.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        lock(&self.entries).remove(key);
    }
}

/// Store persisted as a JSON object in a single file.
///
/// Every mutation is written through to disk. A failed write is logged and
/// the in-memory value still changes, so the running process stays
/// consistent even if the next start sees an older file.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read storage file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse storage file: {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), "Storage opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> bool) {
        let mut entries = lock(&self.entries);
        if f(&mut entries) {
            if let Err(e) = self.save(&entries) {
                warn!(error = %e, path = %self.path.display(), "Failed to save storage file");
            }
        }
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        });
    }

    fn remove(&self, key: &str) {
        self.mutate(|entries| entries.remove(key).is_some());
    }
}

// A poisoned lock still holds a usable map; every write is a single insert or remove.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
