//! BLAKE3 file hasher with a chunked streaming path for large files.
//!
//! # Overview
//!
//! [`Hasher`] computes a 32-byte BLAKE3 digest of a file's content. Two read
//! strategies are used depending on the file size:
//!
//! - Files smaller than the large-file threshold are read into memory in one
//!   call and digested in a single pass.
//! - Files at or above the threshold are read in chunks of exactly the
//!   threshold size; only one chunk is held in memory at a time.
//!
//! Both strategies feed the same algorithm, so the digest of a given content
//! never depends on which path was taken.
//!
//! # Example
//!
//! ```no_run
//! use hashledger::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let hash = hasher.hash_file(Path::new("Cargo.toml")).unwrap();
//! println!("{}", hash_to_hex(&hash));
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::HashError;

/// A BLAKE3 content digest.
pub type Hash = [u8; 32];

/// Default size (in bytes) at which hashing switches to chunked reads.
///
/// The same value is used as the chunk size.
pub const LARGE_FILE_THRESHOLD: u64 = 100_000;

/// File content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    large_file_threshold: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher using [`LARGE_FILE_THRESHOLD`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            large_file_threshold: LARGE_FILE_THRESHOLD,
        }
    }

    /// Override the large-file threshold (and chunk size).
    ///
    /// A value of zero is clamped to one byte so the chunk loop always
    /// makes progress.
    #[must_use]
    pub fn with_large_file_threshold(mut self, threshold: u64) -> Self {
        self.large_file_threshold = threshold.max(1);
        self
    }

    /// The configured large-file threshold in bytes.
    #[must_use]
    pub fn large_file_threshold(&self) -> u64 {
        self.large_file_threshold
    }

    /// Hash a file, choosing the read strategy from its current size.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened, stat'ed or read.
    pub fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let result = if size < self.large_file_threshold {
            self.hash_whole(file, size)
        } else {
            self.hash_chunked(file)
        };
        result.map_err(|e| HashError::from_io(path, e))
    }

    /// Hash an in-memory buffer with the same algorithm used for files.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> Hash {
        *blake3::hash(data).as_bytes()
    }

    fn hash_whole(&self, mut file: File, size_hint: u64) -> io::Result<Hash> {
        let mut contents = Vec::with_capacity(size_hint as usize);
        file.read_to_end(&mut contents)?;
        Ok(self.hash_bytes(&contents))
    }

    fn hash_chunked(&self, mut file: File) -> io::Result<Hash> {
        let mut hasher = blake3::Hasher::new();
        let mut chunk = vec![0u8; self.large_file_threshold as usize];

        loop {
            let filled = read_chunk(&mut file, &mut chunk)?;
            if filled == 0 {
                break;
            }
            hasher.update(&chunk[..filled]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Fill `buf` as far as possible, returning the number of bytes read.
///
/// Short reads are retried until the buffer is full or EOF is reached.
fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Render a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from_bytes(*hash).to_hex().to_string()
}

/// Parse a 64-character hex string back into a digest.
///
/// Returns `None` for wrong lengths or non-hex characters.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|hash| *hash.as_bytes())
}
