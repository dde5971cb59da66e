//! Output formatters for duplicate reports.
//!
//! This module provides different output formats:
//! - Text for terminals (colored when stdout supports it)
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use hashledger::duplicates::{DuplicateReport, DEFAULT_REPORT_LIMIT};
//! use hashledger::output::text::TextOutput;
//! use std::path::Path;
//!
//! let report = DuplicateReport::from_results_file(Path::new("processed_files.csv"), DEFAULT_REPORT_LIMIT).unwrap();
//! TextOutput::new(&report).write_to(&mut std::io::stdout()).unwrap();
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
