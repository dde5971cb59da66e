//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Grouping file records by content hash
//! - Building an ordered, truncated duplicate report with totals

pub mod finder;
pub mod groups;

pub use finder::{DuplicateReport, ReportRow, ReportSummary, DEFAULT_REPORT_LIMIT};
pub use groups::{find_duplicates, DuplicateGroup};
