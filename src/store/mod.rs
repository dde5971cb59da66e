//! Result store for hashed files.
//!
//! Hashes are accumulated in memory and appended to a tab-separated results
//! file in batches, which bounds memory use on very large trees. The results
//! file is append-only: flushing never rewrites earlier rows.
//!
//! # File format
//!
//! ```text
//! path	size	hash
//! /data/a.jpg	1024	af13…
//! ```
//!
//! Fields are separated by a tab; a field is quoted only if it contains a
//! tab, a quote or a line break.

pub mod record;
pub mod results;

use std::path::PathBuf;

pub use record::{FileRecord, HEADER};
pub use results::{FlushStats, ResultStore};

/// Errors raised while writing or reading the results file.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Opening, writing or syncing the results file failed.
    #[error("Results file I/O error for {path}: {source}")]
    Io {
        /// Results file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding failed.
    #[error("Results file CSV error: {0}")]
    Csv(#[from] csv::Error),
}
