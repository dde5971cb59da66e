//! In-memory result batch and the append-only results file.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::record::{FileRecord, ResultRow, HEADER};
use crate::scanner::hex_to_hash;
use super::StoreError;

const DELIMITER: u8 = b'\t';

/// Outcome of a single [`ResultStore::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Rows appended to the results file
    pub written: usize,
    /// Records printed to stdout instead because their path is not Unicode
    pub diverted: usize,
}

/// Accumulates `(path -> size, hash)` records and appends them to the
/// results file in batches.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: BTreeMap<PathBuf, (u64, String)>,
}

impl ResultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hashed file. A second record for the same path replaces the
    /// first.
    pub fn record(&mut self, path: PathBuf, size: u64, hash: String) {
        self.records.insert(path, (size, hash));
    }

    /// Number of records waiting to be flushed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Create (or truncate) `dest` and write the header row.
    ///
    /// Only fresh runs call this; resumed runs append to the existing file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be created or written.
    pub fn initialize(dest: &Path) -> Result<(), StoreError> {
        if dest.exists() {
            log::warn!(
                "Fresh run: overwriting existing results file {}",
                dest.display()
            );
        }
        let file = File::create(dest).map_err(|e| StoreError::io(dest, e))?;
        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush().map_err(|e| StoreError::io(dest, e))?;
        log::debug!("Initialized results file {}", dest.display());
        Ok(())
    }

    /// Append every pending record to `dest` and clear the batch.
    ///
    /// Rows are written in path order. A record whose path is not valid
    /// Unicode cannot be represented in the UTF-8 results file; it is printed
    /// to stdout instead and counted in [`FlushStats::diverted`]. If `dest`
    /// does not exist it is created with a header first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be opened, written or synced.
    /// The batch is kept in that case.
    pub fn flush(&mut self, dest: &Path) -> Result<FlushStats, StoreError> {
        if !dest.exists() {
            log::warn!(
                "Results file {} is missing, recreating it with a header",
                dest.display()
            );
            Self::initialize(dest)?;
        }

        let file = OpenOptions::new()
            .append(true)
            .open(dest)
            .map_err(|e| StoreError::io(dest, e))?;
        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(file);

        let mut stats = FlushStats::default();
        for (path, (size, hash)) in &self.records {
            match path.to_str() {
                Some(path_str) => {
                    writer.serialize(ResultRow {
                        path: path_str,
                        size: *size,
                        hash,
                    })?;
                    stats.written += 1;
                }
                None => {
                    log::warn!(
                        "Path cannot be written as UTF-8, printing instead: {}",
                        path.to_string_lossy()
                    );
                    println!("{}\t{}\t{}", path.to_string_lossy(), size, hash);
                    stats.diverted += 1;
                }
            }
        }

        writer.flush().map_err(|e| StoreError::io(dest, e))?;
        writer
            .get_ref()
            .sync_data()
            .map_err(|e| StoreError::io(dest, e))?;

        self.records.clear();
        log::debug!(
            "Flushed {} rows to {} ({} diverted)",
            stats.written,
            dest.display(),
            stats.diverted
        );
        Ok(stats)
    }

    /// Read every record from the results file.
    ///
    /// Header rows and malformed rows (for example a line cut short by a
    /// crash, or a digest that is not 64 hex characters) are skipped; the
    /// latter are logged. When a path appears more than once, the last row
    /// wins. Records come back sorted by path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be opened or read.
    pub fn read_all(src: &Path) -> Result<Vec<FileRecord>, StoreError> {
        let file = File::open(src).map_err(|e| StoreError::io(src, e))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let header = StringRecord::from(HEADER.to_vec());
        let mut latest: HashMap<String, FileRecord> = HashMap::new();
        let mut record = StringRecord::new();
        let mut line = 0u64;
        let mut malformed = 0usize;

        loop {
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    line += 1;
                    malformed += 1;
                    log::warn!("Skipping unreadable row in {}: {}", src.display(), e);
                    continue;
                }
            }
            line += 1;

            if record == header {
                continue;
            }
            match record.deserialize::<FileRecord>(None) {
                Ok(parsed) if hex_to_hash(&parsed.hash).is_none() => {
                    malformed += 1;
                    log::warn!(
                        "Skipping row {} in {} with invalid digest {:?}",
                        line,
                        src.display(),
                        parsed.hash
                    );
                }
                Ok(parsed) => {
                    latest.insert(parsed.path.clone(), parsed);
                }
                Err(e) => {
                    malformed += 1;
                    log::warn!(
                        "Skipping malformed row {} in {}: {}",
                        line,
                        src.display(),
                        e
                    );
                }
            }
        }

        if malformed > 0 {
            log::warn!("{} malformed rows skipped in {}", malformed, src.display());
        }

        let mut records: Vec<FileRecord> = latest.into_values().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
