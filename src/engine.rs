//! Resumable scan engine.
//!
//! # Overview
//!
//! [`ScanEngine::run`] drives one scan:
//!
//! 1. Acquire the ledger lock and load the ledger. A missing ledger means a
//!    fresh run, and the results file is (re)created with its header.
//! 2. Ensure the root is present, add newly discovered subdirectories as
//!    unprocessed, and save the ledger.
//! 3. Visit every unprocessed directory in path order. Each regular file is
//!    hashed and recorded in the in-memory [`ResultStore`]. Whenever the
//!    batch exceeds the flush threshold it is appended to the results file
//!    and the ledger snapshot is saved.
//! 4. A directory is marked processed once all its files are handled.
//! 5. A final checkpoint persists whatever is left.
//!
//! Results are always appended before the ledger is saved. A crash between
//! the two leaves directories unprocessed whose rows are already on disk; the
//! next run hashes them again and [`ResultStore::read_all`] keeps the last
//! row per path.
//!
//! # Example
//!
//! ```no_run
//! use hashledger::engine::{ScanConfig, ScanEngine};
//!
//! let engine = ScanEngine::new(ScanConfig::new(".", "processed_dirs", "processed_files.csv"));
//! let report = engine.run().unwrap();
//! println!("{} files hashed", report.files_hashed);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ledger::io::temp_path_for;
use crate::ledger::{Ledger, LedgerError, LedgerLock};
use crate::progress::ProgressCallback;
use crate::scanner::{
    hash_to_hex, list_regular_files, normalize_path, HashError, Hasher, ScanError,
};
use crate::store::{ResultStore, StoreError};

/// Default number of pending records that triggers a checkpoint.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 5_000;

/// Default number of files between progress notices.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// What to do when a file cannot be hashed or a directory cannot be listed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run at the first failure, including a file that vanished
    /// between listing and hashing.
    Abort,
    /// Record the failure, keep scanning. Files that vanished are logged and
    /// left out of the report.
    #[default]
    Skip,
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory tree to scan
    pub root: PathBuf,
    /// Ledger snapshot file
    pub ledger_path: PathBuf,
    /// Append-only results file
    pub results_path: PathBuf,
    /// Checkpoint when more than this many records are pending
    pub flush_threshold: usize,
    /// Emit a progress notice every this many files
    pub progress_interval: usize,
    /// Size at which hashing switches to chunked reads
    pub large_file_threshold: u64,
    /// Failure handling
    pub on_error: ErrorPolicy,
}

impl ScanConfig {
    /// Configuration with default tuning for the given paths.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        ledger_path: impl Into<PathBuf>,
        results_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            ledger_path: ledger_path.into(),
            results_path: results_path.into(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            large_file_threshold: crate::scanner::LARGE_FILE_THRESHOLD,
            on_error: ErrorPolicy::default(),
        }
    }

    /// Set the flush threshold.
    #[must_use]
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Set the progress interval (minimum 1).
    #[must_use]
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Set the large-file threshold.
    #[must_use]
    pub fn with_large_file_threshold(mut self, threshold: u64) -> Self {
        self.large_file_threshold = threshold;
        self
    }

    /// Set the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }
}

/// A file or directory that was skipped because of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Path that failed
    pub path: PathBuf,
    /// Error message
    pub reason: String,
}

/// Outcome of a scan run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// No ledger existed before this run
    pub fresh_run: bool,
    /// Directories known to the ledger
    pub directories_total: usize,
    /// Directories marked processed during this run
    pub directories_processed: usize,
    /// Directories still unprocessed after this run
    pub directories_pending: usize,
    /// Files hashed during this run
    pub files_hashed: usize,
    /// Checkpoints written (intermediate and final)
    pub flushes: usize,
    /// Rows appended to the results file
    pub rows_written: usize,
    /// Records printed instead of written (non-Unicode paths)
    pub rows_diverted: usize,
    /// Entries skipped because of errors
    pub skipped: Vec<SkippedEntry>,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
}

impl ScanReport {
    /// Whether any entry was skipped.
    #[must_use]
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Errors that abort a scan run.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Ledger load, save or lock failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Results file failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Hashing failure under [`ErrorPolicy::Abort`].
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Root validation or directory listing failure.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Lexically normalized absolute form of `path`, for identity checks.
fn absolute_path(path: &Path) -> PathBuf {
    normalize_path(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

/// Mutable state of one run.
#[derive(Debug, Default)]
struct ScanContext {
    files_hashed: usize,
    directories_processed: usize,
    flushes: usize,
    rows_written: usize,
    rows_diverted: usize,
    skipped: Vec<SkippedEntry>,
    /// Ledger changed since the last save
    dirty: bool,
    interrupted: bool,
}

/// How a single directory visit ended.
#[derive(Debug, PartialEq, Eq)]
enum DirectoryOutcome {
    Completed,
    Skipped,
    Interrupted,
}

/// Resumable scanner over a directory tree.
pub struct ScanEngine {
    config: ScanConfig,
    hasher: Hasher,
    /// Ledger, results, lock and temp files, never hashed themselves
    state_files: Vec<PathBuf>,
    progress: Option<Arc<dyn ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl ScanEngine {
    /// Create an engine for the given configuration.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        let hasher = Hasher::new().with_large_file_threshold(config.large_file_threshold);
        let state_files = [
            config.ledger_path.clone(),
            config.results_path.clone(),
            LedgerLock::lock_path_for(&config.ledger_path),
            temp_path_for(&config.ledger_path),
        ]
        .iter()
        .map(|p| absolute_path(p))
        .collect();
        Self {
            config,
            hasher,
            state_files,
            progress: None,
            shutdown_flag: None,
        }
    }

    /// Attach a progress observer.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Attach a shutdown flag checked before every file.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn is_state_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        if !self.state_files.iter().any(|s| s.file_name() == Some(name)) {
            return false;
        }
        self.state_files.contains(&absolute_path(path))
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Run a complete scan.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on any fatal failure: the ledger is locked or
    /// corrupt, the root is not a directory, a checkpoint cannot be written,
    /// or a file/directory fails under [`ErrorPolicy::Abort`]. Completed work
    /// is checkpointed before a policy abort is returned.
    pub fn run(&self) -> Result<ScanReport, EngineError> {
        let _lock = LedgerLock::acquire(&self.config.ledger_path)?;

        let (mut ledger, fresh_run) = self.prepare()?;
        let mut store = ResultStore::new();
        let mut ctx = ScanContext::default();

        let pending = ledger.unprocessed();
        log::info!(
            "Scanning {} ({} of {} directories pending)",
            self.config.root.display(),
            pending.len(),
            ledger.len()
        );
        if let Some(progress) = &self.progress {
            progress.on_scan_start(pending.len());
        }

        for dir in &pending {
            if self.is_shutdown_requested() {
                ctx.interrupted = true;
                break;
            }

            match self.process_directory(dir, &mut ledger, &mut store, &mut ctx) {
                Ok(DirectoryOutcome::Completed) | Ok(DirectoryOutcome::Skipped) => {}
                Ok(DirectoryOutcome::Interrupted) => {
                    ctx.interrupted = true;
                    break;
                }
                Err(e) => {
                    log::error!("Aborting scan: {}", e);
                    if let Err(flush_err) = self.checkpoint(&mut ledger, &mut store, &mut ctx) {
                        log::error!("Checkpoint before abort failed: {}", flush_err);
                    }
                    return Err(e);
                }
            }
        }

        if !store.is_empty() || ctx.dirty {
            self.checkpoint(&mut ledger, &mut store, &mut ctx)?;
        }

        if ctx.interrupted {
            log::warn!(
                "Scan interrupted; {} directories left for the next run",
                ledger.pending_count()
            );
        }
        if let Some(progress) = &self.progress {
            progress.on_scan_end(ctx.files_hashed);
        }

        let report = ScanReport {
            fresh_run,
            directories_total: ledger.len(),
            directories_processed: ctx.directories_processed,
            directories_pending: ledger.pending_count(),
            files_hashed: ctx.files_hashed,
            flushes: ctx.flushes,
            rows_written: ctx.rows_written,
            rows_diverted: ctx.rows_diverted,
            skipped: ctx.skipped,
            interrupted: ctx.interrupted,
        };

        log::info!(
            "Scan finished: {} files hashed in {} directories, {} checkpoints, {} skipped",
            report.files_hashed,
            report.directories_processed,
            report.flushes,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Load the ledger, register the root and any new subdirectories, and
    /// save the updated ledger. Returns the ledger and whether the run is
    /// fresh.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the ledger cannot be loaded or saved, the
    /// root is invalid, or the results file cannot be initialized.
    pub fn prepare(&self) -> Result<(Ledger, bool), EngineError> {
        let outcome = Ledger::load(&self.config.ledger_path)?;
        let fresh_run = outcome.is_fresh();
        let mut ledger = outcome.into_ledger();

        let root = &self.config.root;
        if ledger.ensure_root(root) {
            log::debug!("Added root {} to ledger", root.display());
        }
        let added = ledger.discover_subdirectories(root)?;
        if added > 0 {
            log::info!("Discovered {} new directories", added);
        }

        if fresh_run {
            ResultStore::initialize(&self.config.results_path)?;
        }
        ledger.save(&self.config.ledger_path)?;

        Ok((ledger, fresh_run))
    }

    fn process_directory(
        &self,
        dir: &Path,
        ledger: &mut Ledger,
        store: &mut ResultStore,
        ctx: &mut ScanContext,
    ) -> Result<DirectoryOutcome, EngineError> {
        if let Some(progress) = &self.progress {
            progress.on_directory_start(dir);
        }
        log::debug!("Scanning directory {}", dir.display());

        let files = match list_regular_files(dir) {
            Ok(files) => files,
            Err(ScanError::NotFound(_)) => {
                log::warn!("Directory no longer exists: {}", dir.display());
                self.complete_directory(dir, ledger, ctx);
                return Ok(DirectoryOutcome::Completed);
            }
            Err(e) => {
                if self.config.on_error == ErrorPolicy::Abort {
                    return Err(e.into());
                }
                log::warn!("Skipping directory {}: {}", dir.display(), e);
                ctx.skipped.push(SkippedEntry {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
                return Ok(DirectoryOutcome::Skipped);
            }
        };

        for file in files {
            if self.is_shutdown_requested() {
                log::debug!("Shutdown requested inside {}", dir.display());
                return Ok(DirectoryOutcome::Interrupted);
            }

            if self.is_state_file(&file.path) {
                log::debug!("Not hashing own state file {}", file.path.display());
                continue;
            }

            match self.hasher.hash_file(&file.path) {
                Ok(hash) => {
                    log::trace!("Hashed {}", file.path.display());
                    store.record(file.path, file.size, hash_to_hex(&hash));
                    ctx.files_hashed += 1;
                    if ctx.files_hashed % self.config.progress_interval.max(1) == 0 {
                        log::info!("Files processed: {}", ctx.files_hashed);
                        if let Some(progress) = &self.progress {
                            progress.on_files_processed(ctx.files_hashed);
                        }
                    }
                }
                Err(HashError::NotFound(path)) if self.config.on_error == ErrorPolicy::Skip => {
                    log::warn!("File vanished before hashing: {}", path.display());
                }
                Err(e) => {
                    if self.config.on_error == ErrorPolicy::Abort {
                        return Err(e.into());
                    }
                    log::warn!("Skipping file: {}", e);
                    ctx.skipped.push(SkippedEntry {
                        path: file.path,
                        reason: e.to_string(),
                    });
                }
            }

            if store.len() > self.config.flush_threshold {
                self.checkpoint(ledger, store, ctx)?;
            }
        }

        self.complete_directory(dir, ledger, ctx);
        Ok(DirectoryOutcome::Completed)
    }

    fn complete_directory(&self, dir: &Path, ledger: &mut Ledger, ctx: &mut ScanContext) {
        ledger.mark_processed(dir);
        ctx.directories_processed += 1;
        ctx.dirty = true;
        if let Some(progress) = &self.progress {
            progress.on_directory_done(dir);
        }
    }

    /// Append pending rows, then save the ledger.
    fn checkpoint(
        &self,
        ledger: &mut Ledger,
        store: &mut ResultStore,
        ctx: &mut ScanContext,
    ) -> Result<(), EngineError> {
        let stats = store.flush(&self.config.results_path)?;
        ledger.save(&self.config.ledger_path)?;

        ctx.flushes += 1;
        ctx.rows_written += stats.written;
        ctx.rows_diverted += stats.diverted;
        ctx.dirty = false;

        log::info!(
            "Checkpoint {}: {} rows appended, {}/{} directories processed",
            ctx.flushes,
            stats.written,
            ledger.processed_count(),
            ledger.len()
        );
        if let Some(progress) = &self.progress {
            progress.on_flush(stats.written);
        }
        Ok(())
    }
}
