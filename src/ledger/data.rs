//! In-memory directory ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::scanner::{discover_directories, key_to_path, path_to_key, ScanError};

/// Current version of the ledger file format.
pub const LEDGER_VERSION: u32 = 1;

/// Persisted mapping from directory path to its processed flag.
///
/// A directory marked processed is never reset by the scan engine, which is
/// what lets a re-run skip completed work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Format version.
    pub version: u32,
    /// Root path of the first run that created this ledger.
    pub root: Option<String>,
    /// When the ledger was created.
    pub created_at: DateTime<Utc>,
    /// When the ledger was last saved.
    pub updated_at: DateTime<Utc>,
    /// Directory key (see [`path_to_key`]) -> processed.
    directories: BTreeMap<String, bool>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: LEDGER_VERSION,
            root: None,
            created_at: now,
            updated_at: now,
            directories: BTreeMap::new(),
        }
    }

    /// Insert `root` as unprocessed if it is not present yet.
    ///
    /// Returns `true` if the root was inserted.
    pub fn ensure_root(&mut self, root: &Path) -> bool {
        if self.root.is_none() {
            self.root = root.to_str().map(str::to_owned);
        }
        self.insert_unprocessed(root)
    }

    /// Insert a directory as unprocessed unless it is already known.
    ///
    /// Existing entries, processed or not, are left untouched. Paths that are
    /// not valid Unicode are keyed by their raw bytes.
    pub fn insert_unprocessed(&mut self, dir: &Path) -> bool {
        let Some(key) = path_to_key(dir) else {
            log::warn!(
                "Cannot record directory in ledger: {}",
                dir.to_string_lossy()
            );
            return false;
        };
        if self.directories.contains_key(&key) {
            return false;
        }
        self.directories.insert(key, false);
        true
    }

    /// Walk `root` recursively and add every subdirectory not yet present.
    ///
    /// Returns the number of newly inserted directories.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if `root` is missing or not a directory.
    pub fn discover_subdirectories(&mut self, root: &Path) -> Result<usize, ScanError> {
        let mut added = 0;
        for dir in discover_directories(root)? {
            if self.insert_unprocessed(&dir) {
                added += 1;
            }
        }
        log::debug!("Ledger: {} new directories under {}", added, root.display());
        Ok(added)
    }

    /// Mark a directory as processed.
    ///
    /// Returns `false` if the directory was not in the ledger.
    pub fn mark_processed(&mut self, dir: &Path) -> bool {
        match path_to_key(dir).and_then(|k| self.directories.get_mut(&k)) {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    /// Processed flag of a directory, or `None` if unknown.
    #[must_use]
    pub fn is_processed(&self, dir: &Path) -> Option<bool> {
        path_to_key(dir).and_then(|k| self.directories.get(&k).copied())
    }

    /// All directories still waiting to be scanned, ordered by path.
    #[must_use]
    pub fn unprocessed(&self) -> Vec<PathBuf> {
        let mut pending: Vec<PathBuf> = self
            .directories
            .iter()
            .filter(|&(_, &processed)| !processed)
            .map(|(key, _)| key_to_path(key))
            .collect();
        pending.sort();
        pending
    }

    /// Number of known directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.directories.len()
    }

    /// Check whether the ledger has no directories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    /// Number of directories marked processed.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.directories.values().filter(|&&p| p).count()
    }

    /// Number of directories still unprocessed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.len() - self.processed_count()
    }
}
