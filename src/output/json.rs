//! JSON output formatter for duplicate reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     { "hash": "abc123...", "size": 1024, "files": ["/a", "/b"] }
//!   ],
//!   "rows": [
//!     { "hash": "abc123...", "size": 1024, "path": "/a" }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 2,
//!     "wasted_space": 1024,
//!     "total_rows": 2,
//!     "shown_rows": 2
//!   },
//!   "scan": { "files_hashed": 100, "interrupted": false, "...": "..." },
//!   "exit_code": 0,
//!   "exit_code_name": "HL000"
//! }
//! ```
//!
//! `scan` is present only when the report follows a scan run.

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, DuplicateReport, ReportRow, ReportSummary};
use crate::engine::ScanReport;
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup<'a> {
    /// BLAKE3 hash as hexadecimal string (64 characters)
    pub hash: &'a str,
    /// File size in bytes
    pub size: u64,
    /// Paths of all files with this content
    pub files: &'a [String],
}

impl<'a> From<&'a DuplicateGroup> for JsonDuplicateGroup<'a> {
    fn from(group: &'a DuplicateGroup) -> Self {
        Self {
            hash: &group.hash,
            size: group.size,
            files: &group.paths,
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Every duplicate group (not truncated)
    pub duplicates: Vec<JsonDuplicateGroup<'a>>,
    /// Display rows, truncated to the report limit
    pub rows: &'a [ReportRow],
    /// Totals
    pub summary: &'a ReportSummary,
    /// Outcome of the scan that preceded the report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<&'a ScanReport>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "HL000")
    pub exit_code_name: &'static str,
}

impl<'a> JsonOutput<'a> {
    /// Create a new JSON output.
    ///
    /// # Example
    ///
    /// ```
    /// use hashledger::duplicates::DuplicateReport;
    /// use hashledger::error::ExitCode;
    /// use hashledger::output::json::JsonOutput;
    ///
    /// let report = DuplicateReport::from_records(Vec::new(), 100);
    /// let output = JsonOutput::new(&report, None, ExitCode::Success);
    /// assert!(output.duplicates.is_empty());
    /// ```
    #[must_use]
    pub fn new(
        report: &'a DuplicateReport,
        scan: Option<&'a ScanReport>,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            duplicates: report.groups.iter().map(JsonDuplicateGroup::from).collect(),
            rows: &report.rows,
            summary: &report.summary,
            scan,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
