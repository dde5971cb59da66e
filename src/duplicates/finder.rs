//! Duplicate report assembly.
//!
//! [`DuplicateReport`] flattens duplicate groups into `(hash, size, path)`
//! rows ordered by hash, truncates the rows to a display limit, and keeps
//! summary totals over the full, untruncated result.
//!
//! The CLI builds its report with [`DuplicateReport::from_results_file`], so
//! duplicates are found across every batch ever flushed, including those of
//! earlier runs.

use serde::Serialize;
use std::path::Path;

use super::groups::{find_duplicates, DuplicateGroup};
use crate::store::{FileRecord, ResultStore, StoreError};

/// Default number of rows shown in a report.
pub const DEFAULT_REPORT_LIMIT: usize = 100;

/// One displayed report line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// Content hash (hex)
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// File path
    pub path: String,
}

/// Totals over every duplicate group, independent of the display limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Number of records examined
    pub total_files: usize,
    /// Number of hash groups with 2+ files
    pub duplicate_groups: usize,
    /// Number of files belonging to a duplicate group
    pub duplicate_files: usize,
    /// Bytes occupied by redundant copies
    pub wasted_space: u64,
    /// Rows before truncation
    pub total_rows: usize,
    /// Rows kept after truncation
    pub shown_rows: usize,
}

impl ReportSummary {
    /// Whether rows were cut off by the display limit.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.shown_rows < self.total_rows
    }
}

/// Ordered, truncated duplicate report.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    /// Displayed rows, ordered by hash then path
    pub rows: Vec<ReportRow>,
    /// Totals over the full result
    pub summary: ReportSummary,
    /// Every duplicate group (not truncated)
    #[serde(skip)]
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    /// Build a report from already-grouped duplicates.
    #[must_use]
    pub fn new(groups: Vec<DuplicateGroup>, total_files: usize, limit: usize) -> Self {
        let total_rows: usize = groups.iter().map(DuplicateGroup::len).sum();

        let rows: Vec<ReportRow> = groups
            .iter()
            .flat_map(|g| {
                g.paths.iter().map(move |path| ReportRow {
                    hash: g.hash.clone(),
                    size: g.size,
                    path: path.clone(),
                })
            })
            .take(limit)
            .collect();

        let summary = ReportSummary {
            total_files,
            duplicate_groups: groups.len(),
            duplicate_files: total_rows,
            wasted_space: groups.iter().map(DuplicateGroup::wasted_space).sum(),
            total_rows,
            shown_rows: rows.len(),
        };

        Self {
            rows,
            summary,
            groups,
        }
    }

    /// Build a report from a set of records.
    #[must_use]
    pub fn from_records(records: Vec<FileRecord>, limit: usize) -> Self {
        let total_files = records.len();
        Self::new(find_duplicates(records), total_files, limit)
    }

    /// Build a report from the full content of a results file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the results file cannot be read.
    pub fn from_results_file(path: &Path, limit: usize) -> Result<Self, StoreError> {
        let records = ResultStore::read_all(path)?;
        log::info!(
            "Computing duplicates over {} records from {}",
            records.len(),
            path.display()
        );
        Ok(Self::from_records(records, limit))
    }

    /// Whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}
