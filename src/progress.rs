//! Progress reporting utilities using indicatif.
//!
//! The scan engine reports through the [`ProgressCallback`] trait; [`Progress`]
//! is the terminal implementation used by the CLI. It shows a bar over the
//! pending directories with a "Files processed: N" message that is refreshed
//! every progress interval. When stderr is not a terminal the bar is hidden by
//! indicatif, and the same notices are printed as plain lines instead.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress callback for a scan run.
///
/// Implement this trait to observe the engine without coupling it to a
/// terminal.
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first directory, with the number of directories
    /// waiting to be scanned.
    fn on_scan_start(&self, pending_dirs: usize);

    /// Called when the engine starts listing a directory.
    fn on_directory_start(&self, _dir: &Path) {}

    /// Called when a directory has been marked processed.
    fn on_directory_done(&self, _dir: &Path) {}

    /// Called every progress interval with the running file count.
    fn on_files_processed(&self, count: usize);

    /// Called after each flush with the number of rows written.
    fn on_flush(&self, _rows: usize) {}

    /// Called once when the run ends (normally or interrupted).
    fn on_scan_end(&self, files_processed: usize);
}

/// Terminal progress reporter.
pub struct Progress {
    bar: ProgressBar,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashledger::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        Self { bar, quiet }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} dirs {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn notice(&self, message: String) {
        if self.quiet {
            return;
        }
        if self.bar.is_hidden() {
            eprintln!("{message}");
        } else {
            self.bar.set_message(message);
        }
    }
}

impl ProgressCallback for Progress {
    fn on_scan_start(&self, pending_dirs: usize) {
        if self.quiet {
            return;
        }
        self.bar.set_style(Self::style());
        self.bar.set_length(pending_dirs as u64);
        self.bar.set_message("Files processed: 0");
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_directory_done(&self, _dir: &Path) {
        self.bar.inc(1);
    }

    fn on_files_processed(&self, count: usize) {
        self.notice(format!("Files processed: {count}"));
    }

    fn on_flush(&self, rows: usize) {
        log::debug!("Checkpoint written ({} rows)", rows);
    }

    fn on_scan_end(&self, files_processed: usize) {
        if self.quiet {
            return;
        }
        self.bar
            .finish_with_message(format!("Files processed: {files_processed}"));
    }
}
