//! File records as stored in the results file.

use serde::{Deserialize, Serialize};

/// Column names of the results file header.
pub const HEADER: [&str; 3] = ["path", "size", "hash"];

/// One hashed file: full path, size in bytes and lowercase hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path of the file
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Lowercase hex content digest
    pub hash: String,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(path: impl Into<String>, size: u64, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size,
            hash: hash.into(),
        }
    }
}

/// Borrowed row written by [`super::ResultStore::flush`].
#[derive(Debug, Serialize)]
pub(crate) struct ResultRow<'a> {
    pub path: &'a str,
    pub size: u64,
    pub hash: &'a str,
}
