//! CSV output formatter for duplicate reports.
//!
//! One row is generated for each displayed report row.
//!
//! # Columns
//!
//! - `group_id`: Numeric ID identifying the duplicate group (1-based, in hash order)
//! - `hash`: BLAKE3 content hash (hexadecimal)
//! - `size`: File size in bytes
//! - `path`: File path

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateReport;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    hash: &'a str,
    size: u64,
    path: &'a str,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a DuplicateReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a DuplicateReport) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut group_id = 0;
        let mut previous: Option<&str> = None;
        for row in &self.report.rows {
            if previous != Some(row.hash.as_str()) {
                group_id += 1;
                previous = Some(&row.hash);
            }
            csv_writer.serialize(CsvRow {
                group_id,
                hash: &row.hash,
                size: row.size,
                path: &row.path,
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
