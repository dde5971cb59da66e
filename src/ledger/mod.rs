//! Directory ledger: which directories have been fully hashed.
//!
//! The ledger is the checkpoint that makes scans resumable. Every directory
//! under the scan root is recorded with a processed flag; the scan engine
//! only visits directories whose flag is still `false`, and a flag that was
//! set is never cleared.
//!
//! # Features
//!
//! * **Snapshots**: The whole ledger is written at once, never as a delta.
//! * **Atomicity**: Saves write a temporary file and rename it into place.
//! * **Integrity**: Each snapshot carries a SHA256 checksum.
//! * **Exclusivity**: [`LedgerLock`] keeps two runs off the same ledger.
//!
//! # Architecture
//!
//! * [`data`]: The in-memory [`Ledger`] and its operations.
//! * [`io`]: Loading, saving and verifying snapshot files.
//! * [`lock`]: The per-ledger lock file.

pub mod data;
pub mod io;
pub mod lock;

use std::path::PathBuf;

use crate::scanner::ScanError;

pub use data::{Ledger, LEDGER_VERSION};
pub use io::LoadOutcome;
pub use lock::LedgerLock;

/// Errors raised while loading, saving or locking a ledger.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// Reading or writing a ledger-related file failed.
    #[error("Ledger I/O error for {path}: {source}")]
    Io {
        /// File that could not be accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The ledger file exists but could not be decoded.
    #[error("Ledger file {path} is corrupted: {reason}")]
    Corrupt {
        /// Ledger file path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// The stored checksum does not match the snapshot content.
    #[error("Ledger integrity check failed for {0}: checksum mismatch")]
    ChecksumMismatch(PathBuf),

    /// The snapshot was written by an incompatible version.
    #[error("Unsupported ledger version: {found}. Current version is {expected}.")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// Another run holds the lock on this ledger.
    #[error("Ledger is locked by {path} (pid {owner}); remove the file if no other run is active")]
    Locked {
        /// Lock file path
        path: PathBuf,
        /// Content of the lock file (the owning PID)
        owner: String,
    },

    /// Serializing the snapshot failed.
    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Discovering directories under the root failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}
