//! Plain-text report for terminals.
//!
//! One line per duplicate row, `hash  size  path`, followed by the totals.
//! Colors come from yansi and are switched off globally by `--no-color`.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::duplicates::DuplicateReport;
use crate::engine::ScanReport;

/// Text formatter for a [`DuplicateReport`].
pub struct TextOutput<'a> {
    report: &'a DuplicateReport,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter for `report`.
    #[must_use]
    pub fn new(report: &'a DuplicateReport) -> Self {
        Self { report }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let summary = &self.report.summary;

        if self.report.rows.is_empty() {
            writeln!(
                writer,
                "{} ({} files examined)",
                "No duplicate files found.".green(),
                summary.total_files
            )?;
            return Ok(());
        }

        writeln!(writer, "{}", "Duplicate files (hash, size, path):".bold())?;
        let width = self
            .report
            .rows
            .iter()
            .map(|r| r.size.to_string().len())
            .max()
            .unwrap_or(1);
        for row in &self.report.rows {
            writeln!(
                writer,
                "{}  {:>width$}  {}",
                row.hash.dim(),
                row.size,
                row.path,
                width = width
            )?;
        }

        if summary.is_truncated() {
            writeln!(
                writer,
                "{}",
                format!(
                    "... showing {} of {} rows",
                    summary.shown_rows, summary.total_rows
                )
                .yellow()
            )?;
        }

        writeln!(
            writer,
            "{} duplicate groups, {} files, {} reclaimable ({} files examined)",
            summary.duplicate_groups.bold(),
            summary.duplicate_files.bold(),
            ByteSize::b(summary.wasted_space).to_string().green(),
            summary.total_files
        )
    }

    /// Render the report into a string.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if formatting fails.
    pub fn to_string(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Write a short summary of a scan run.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn write_scan_summary<W: Write>(report: &ScanReport, writer: &mut W) -> io::Result<()> {
    let run_kind = if report.fresh_run { "fresh" } else { "resumed" };
    writeln!(
        writer,
        "Scan {} ({} run): {} files hashed in {} directories, {} checkpoints",
        if report.interrupted {
            "interrupted".yellow().bold()
        } else {
            "complete".green().bold()
        },
        run_kind,
        report.files_hashed,
        report.directories_processed,
        report.flushes
    )?;

    if report.directories_pending > 0 {
        writeln!(
            writer,
            "{} of {} directories left for the next run",
            report.directories_pending, report.directories_total
        )?;
    }
    if report.rows_diverted > 0 {
        writeln!(
            writer,
            "{} records with non-Unicode paths were printed instead of stored",
            report.rows_diverted
        )?;
    }
    if report.has_skipped() {
        writeln!(
            writer,
            "{}",
            format!("{} entries skipped:", report.skipped.len()).red()
        )?;
        for entry in &report.skipped {
            writeln!(writer, "  {}: {}", entry.path.display(), entry.reason)?;
        }
    }
    Ok(())
}
