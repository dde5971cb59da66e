//! Exclusive run lock for a ledger file.
//!
//! Two runs writing the same ledger and results file would interleave rows
//! and overwrite each other's snapshots. [`LedgerLock`] creates
//! `<ledger>.lock` with `create_new`, so only one holder can exist, and
//! removes it when dropped. The file holds the PID of its owner; a lock whose
//! owner is no longer running (killed, out of memory, power loss) is stale
//! and is taken over with a warning.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sysinfo::{Pid, System};

use super::LedgerError;

/// Guard holding the lock file for the duration of a run.
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
}

impl LedgerLock {
    /// Path of the lock file guarding `ledger_path`.
    #[must_use]
    pub fn lock_path_for(ledger_path: &Path) -> PathBuf {
        let mut name = ledger_path
            .file_name()
            .map_or_else(|| OsString::from("ledger"), ToOwned::to_owned);
        name.push(".lock");
        ledger_path.with_file_name(name)
    }

    /// Acquire the lock for `ledger_path`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Locked`] if another holder exists, or
    /// [`LedgerError::Io`] if the lock file cannot be created.
    pub fn acquire(ledger_path: &Path) -> Result<Self, LedgerError> {
        let path = Self::lock_path_for(ledger_path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = match create_lock_file(&path)? {
            Some(file) => file,
            None => {
                let owner = read_owner(&path);
                if owner_is_running(&owner) {
                    return Err(LedgerError::Locked { path, owner });
                }
                log::warn!(
                    "Taking over stale lock {} (owner {:?} is not running)",
                    path.display(),
                    owner
                );
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => return Err(LedgerError::Io { path, source }),
                }
                match create_lock_file(&path)? {
                    Some(file) => file,
                    None => {
                        let owner = read_owner(&path);
                        return Err(LedgerError::Locked { path, owner });
                    }
                }
            }
        };

        if let Err(source) = writeln!(file, "{}", std::process::id()) {
            let _ = fs::remove_file(&path);
            return Err(LedgerError::Io { path, source });
        }

        log::debug!("Acquired ledger lock {}", path.display());
        Ok(Self { path })
    }

    /// Path of the held lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create the lock file, or return `None` if it already exists.
fn create_lock_file(path: &Path) -> Result<Option<File>, LedgerError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(source) => Err(LedgerError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_owner(path: &Path) -> String {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Whether the PID recorded in a lock file belongs to a live process.
///
/// Content that is not a PID counts as stale.
fn owner_is_running(owner: &str) -> bool {
    let Ok(pid) = owner.parse::<u32>() else {
        return false;
    };
    if pid == std::process::id() {
        return true;
    }
    let mut system = System::new();
    system.refresh_process(Pid::from_u32(pid))
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}
