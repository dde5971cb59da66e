//! Grouping of file records by content hash.
//!
//! # Overview
//!
//! [`find_duplicates`] is a pure function over whatever records it is given:
//! it groups them by hash, keeps only groups with two or more members, and
//! orders the result by hash ascending with an explicit stable sort. Paths
//! inside a group are sorted as well, so the output never depends on input
//! order.
//!
//! # Example
//!
//! ```
//! use hashledger::duplicates::find_duplicates;
//! use hashledger::store::FileRecord;
//!
//! let records = vec![
//!     FileRecord::new("/a", 10, "h1"),
//!     FileRecord::new("/b", 10, "h1"),
//!     FileRecord::new("/c", 20, "h2"),
//! ];
//!
//! let groups = find_duplicates(records);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].paths, vec!["/a", "/b"]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::store::FileRecord;

/// A set of files sharing one content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Lowercase hex content hash shared by every file
    pub hash: String,
    /// File size in bytes (taken from the first path)
    pub size: u64,
    /// Paths of the files, sorted ascending
    pub paths: Vec<String>,
}

impl DuplicateGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of redundant copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Bytes that removing the redundant copies would free.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }
}

/// Group records by hash and return the groups with 2+ members, ordered by
/// hash ascending.
#[must_use]
pub fn find_duplicates(records: impl IntoIterator<Item = FileRecord>) -> Vec<DuplicateGroup> {
    let mut by_hash: HashMap<String, Vec<(String, u64)>> = HashMap::new();
    let mut total = 0usize;

    for record in records {
        total += 1;
        by_hash
            .entry(record.hash)
            .or_default()
            .push((record.path, record.size));
    }

    let mut groups: Vec<DuplicateGroup> = by_hash
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(hash, mut members)| {
            members.sort_by(|a, b| a.0.cmp(&b.0));
            let size = members[0].1;
            if members.iter().any(|(_, s)| *s != size) {
                log::debug!("Hash {} shared by files of different sizes", hash);
            }
            DuplicateGroup {
                hash,
                size,
                paths: members.into_iter().map(|(path, _)| path).collect(),
            }
        })
        .collect();

    groups.sort_by(|a, b| a.hash.cmp(&b.hash));

    log::debug!(
        "Grouping complete: {} records -> {} duplicate groups",
        total,
        groups.len()
    );
    groups
}
