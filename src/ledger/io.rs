//! Loading and saving ledger snapshots.
//!
//! A snapshot is a JSON envelope holding the whole [`Ledger`] plus a SHA-256
//! checksum of its compact serialization. Saves go to a sibling temporary
//! file that is then renamed over the destination, so an interrupted save
//! leaves the previous snapshot intact.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::data::{Ledger, LEDGER_VERSION};
use super::LedgerError;

/// Envelope for ledger files to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerEnvelope {
    /// SHA256 checksum of the serialized ledger data.
    checksum: String,
    /// The actual ledger data.
    ledger: Ledger,
}

/// Result of [`Ledger::load`].
#[derive(Debug)]
pub enum LoadOutcome {
    /// No snapshot existed; the ledger is empty and this is a fresh run.
    Fresh(Ledger),
    /// A snapshot was found and decoded.
    Resumed(Ledger),
}

impl LoadOutcome {
    /// Whether no previous snapshot was found.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    /// Take the ledger out of the outcome.
    #[must_use]
    pub fn into_ledger(self) -> Ledger {
        match self {
            Self::Fresh(ledger) | Self::Resumed(ledger) => ledger,
        }
    }
}

fn checksum_of(ledger: &Ledger) -> Result<String, serde_json::Error> {
    let compact = serde_json::to_vec(ledger)?;
    let mut hasher = Sha256::new();
    hasher.update(&compact);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Sibling path used for atomic writes (`<name>.tmp`).
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("ledger"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

impl Ledger {
    /// Load a snapshot from `path`.
    ///
    /// A missing file is not an error: it yields [`LoadOutcome::Fresh`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the file exists but cannot be read, is not a
    /// valid envelope, fails its checksum, or has an unsupported version.
    pub fn load(path: &Path) -> Result<LoadOutcome, LedgerError> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No ledger at {}, starting a fresh run", path.display());
                return Ok(LoadOutcome::Fresh(Ledger::new()));
            }
            Err(source) => {
                return Err(LedgerError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let envelope: LedgerEnvelope =
            serde_json::from_slice(&content).map_err(|e| LedgerError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let calculated = checksum_of(&envelope.ledger)?;
        if calculated != envelope.checksum {
            return Err(LedgerError::ChecksumMismatch(path.to_path_buf()));
        }

        let ledger = envelope.ledger;
        if ledger.version != LEDGER_VERSION {
            return Err(LedgerError::UnsupportedVersion {
                found: ledger.version,
                expected: LEDGER_VERSION,
            });
        }

        log::info!(
            "Resuming from ledger {} ({} of {} directories processed)",
            path.display(),
            ledger.processed_count(),
            ledger.len()
        );
        Ok(LoadOutcome::Resumed(ledger))
    }

    /// Atomically write the whole ledger to `path`, replacing any previous
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if serialization or any file operation fails.
    pub fn save(&mut self, path: &Path) -> Result<(), LedgerError> {
        self.updated_at = Utc::now();

        let envelope = LedgerEnvelope {
            checksum: checksum_of(self)?,
            ledger: self.clone(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = temp_path_for(path);
        let io_err = |source| LedgerError::Io {
            path: temp_path.clone(),
            source,
        };

        let file = File::create(&temp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &envelope)?;
        writer.flush().map_err(io_err)?;
        writer
            .into_inner()
            .map_err(|e| io_err(e.into_error()))?
            .sync_all()
            .map_err(io_err)?;

        fs::rename(&temp_path, path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            LedgerError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;

        log::debug!(
            "Saved ledger to {} ({} directories)",
            path.display(),
            self.len()
        );
        Ok(())
    }
}
