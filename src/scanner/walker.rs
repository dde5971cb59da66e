//! Directory discovery and per-directory file listing.
//!
//! # Overview
//!
//! The scan is split in two steps that both live here:
//!
//! - [`discover_directories`] walks the whole tree once (deepest first) and
//!   returns every subdirectory below the root. The ledger records these as
//!   work items.
//! - [`list_regular_files`] lists a single directory, non-recursively, and
//!   returns only its regular files. Subdirectories are handled as their own
//!   ledger entries, and symlinks, sockets, FIFOs and device nodes are never
//!   hashed.
//!
//! Symlinked directories are not followed, so cycles cannot occur.
//!
//! # Example
//!
//! ```no_run
//! use hashledger::scanner::{discover_directories, list_regular_files};
//! use std::path::Path;
//!
//! for dir in discover_directories(Path::new(".")).unwrap() {
//!     let files = list_regular_files(&dir).unwrap();
//!     println!("{}: {} files", dir.display(), files.len());
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{FileEntry, ScanError};

/// Recursively enumerate every subdirectory of `root`, deepest first.
///
/// The root itself is not included. Subtrees that cannot be read are logged
/// and skipped.
///
/// # Errors
///
/// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`] if `root`
/// is not an existing directory.
pub fn discover_directories(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    check_directory(root)?;

    let mut found = Vec::new();
    let walk = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name();

    for entry in walk {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).display().to_string();
                log::warn!("Skipping unreadable path during discovery {}: {}", path, e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        log::trace!("Discovered directory: {}", entry.path().display());
        found.push(entry.into_path());
    }

    log::debug!(
        "Discovered {} subdirectories under {}",
        found.len(),
        root.display()
    );
    Ok(found)
}

/// List the regular files directly inside `dir`, sorted by file name.
///
/// Entries that disappear between listing and stat are skipped.
///
/// # Errors
///
/// Returns [`ScanError`] if `dir` cannot be opened or read.
pub fn list_regular_files(dir: &Path) -> Result<Vec<FileEntry>, ScanError> {
    let read_dir = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir, e))?;

    let mut files = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| ScanError::from_io(dir, e))?;
        let path = entry.path();

        // DirEntry::file_type does not follow symlinks.
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                log::debug!("Cannot read file type of {}: {}", path.display(), e);
                continue;
            }
        };
        if !file_type.is_file() {
            log::trace!("Skipping non-regular entry: {}", path.display());
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => files.push(FileEntry::new(path, metadata.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("File vanished before stat: {}", path.display());
            }
            Err(e) => return Err(ScanError::from_io(&path, e)),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn check_directory(path: &Path) -> Result<(), ScanError> {
    let metadata = fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(ScanError::NotADirectory(path.to_path_buf()))
    }
}
