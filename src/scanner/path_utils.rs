//! Lexical path normalization and ledger keys.
//!
//! Ledger keys and result rows are path strings, so the same directory must
//! always be spelled the same way. [`normalize_path`] collapses
//! redundant separators, drops `.` segments and resolves `..` against the
//! preceding component without touching the filesystem (symlinks are not
//! resolved).
//!
//! [`path_to_key`] turns a path into a ledger key without losing bytes: a
//! valid Unicode path is its own key, and on Unix any other path is stored as
//! a NUL marker followed by the hex of its raw bytes. NUL cannot occur in a
//! real path, so the two forms never collide.
//!
//! # Example
//!
//! ```
//! use hashledger::scanner::path_utils::normalize_path;
//! use std::path::{Path, PathBuf};
//!
//! assert_eq!(normalize_path(Path::new("a//b/./c/../d")), PathBuf::from("a/b/d"));
//! assert_eq!(normalize_path(Path::new("")), PathBuf::from("."));
//! ```

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically.
///
/// - Empty input and inputs that reduce to nothing become `.`.
/// - `..` after a normal component removes it; `..` directly after the root
///   is dropped; leading `..` on a relative path is kept.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }

    parts.iter().map(|c| c.as_os_str()).collect()
}

const RAW_KEY_MARKER: char = '\0';

/// Encode a path as a ledger key.
///
/// Returns `None` only on platforms without raw byte paths, for paths that
/// are not valid Unicode.
#[must_use]
pub fn path_to_key(path: &Path) -> Option<String> {
    if let Some(s) = path.to_str() {
        return Some(s.to_owned());
    }
    raw_key(path)
}

/// Decode a key produced by [`path_to_key`].
#[must_use]
pub fn key_to_path(key: &str) -> PathBuf {
    key.strip_prefix(RAW_KEY_MARKER)
        .and_then(raw_path)
        .unwrap_or_else(|| PathBuf::from(key))
}

#[cfg(unix)]
fn raw_key(path: &Path) -> Option<String> {
    use std::os::unix::ffi::OsStrExt;

    let mut key = String::from(RAW_KEY_MARKER);
    key.push_str(&hex::encode(path.as_os_str().as_bytes()));
    Some(key)
}

#[cfg(not(unix))]
fn raw_key(_path: &Path) -> Option<String> {
    None
}

#[cfg(unix)]
fn raw_path(encoded: &str) -> Option<PathBuf> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    hex::decode(encoded)
        .ok()
        .map(|bytes| PathBuf::from(OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn raw_path(_encoded: &str) -> Option<PathBuf> {
    None
}
