//! hashledger - resumable content-hash scanner and duplicate finder.
//!
//! Hashes every regular file under a directory tree with BLAKE3, appends the
//! results to a tab-separated file in bounded batches, and checkpoints which
//! directories are complete in a ledger so an interrupted scan resumes without
//! re-hashing finished directories. Duplicates are reported from the full
//! results file.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod store;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{Cli, Commands, OutputFormat, ReportArgs, ScanArgs, StatusArgs};
use crate::config::Config;
use crate::duplicates::DuplicateReport;
use crate::engine::{ScanEngine, ScanReport};
use crate::error::ExitCode;
use crate::ledger::{Ledger, LoadOutcome};
use crate::output::{text, CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for any fatal failure. Interruption and skipped entries
/// are not errors; they are reported through the returned [`ExitCode`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.no_color);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Scan(args) => run_scan(config, &args, cli.quiet),
        Commands::Report(args) => run_report(config, &args),
        Commands::Status(args) => run_status(config, &args),
    }
}

fn run_scan(mut config: Config, args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    config
        .apply_scan_args(args)
        .context("Invalid scan options")?;

    let handler = signal::install_handler()?;
    let engine = ScanEngine::new(config.scan_config())
        .with_progress_callback(Arc::new(Progress::new(quiet)))
        .with_shutdown_flag(handler.get_flag());

    let scan = engine
        .run()
        .with_context(|| format!("Scan of {} failed", config.root_path.display()))?;
    let exit_code = ExitCode::from_scan(&scan);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.no_report {
        if args.output == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut out, &scan)?;
            writeln!(out)?;
        } else if !quiet {
            text::write_scan_summary(&scan, &mut out)?;
        }
        return Ok(exit_code);
    }

    let report = DuplicateReport::from_results_file(&config.results_path, config.report_limit)
        .with_context(|| format!("Failed to read {}", config.results_path.display()))?;

    if args.output == OutputFormat::Text && !quiet {
        text::write_scan_summary(&scan, &mut out)?;
        writeln!(out)?;
    } else if args.output == OutputFormat::Csv && !quiet {
        text::write_scan_summary(&scan, &mut io::stderr())?;
    }
    render_report(&report, Some(&scan), args.output, exit_code, &mut out)?;
    Ok(exit_code)
}

fn run_report(mut config: Config, args: &ReportArgs) -> Result<ExitCode> {
    config.apply_report_args(args);

    let report = DuplicateReport::from_results_file(&config.results_path, config.report_limit)
        .with_context(|| format!("Failed to read {}", config.results_path.display()))?;

    let stdout = io::stdout();
    render_report(
        &report,
        None,
        args.output,
        ExitCode::Success,
        &mut stdout.lock(),
    )?;
    Ok(ExitCode::Success)
}

fn render_report<W: Write>(
    report: &DuplicateReport,
    scan: Option<&ScanReport>,
    format: OutputFormat,
    exit_code: ExitCode,
    out: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Text => TextOutput::new(report).write_to(out)?,
        OutputFormat::Json => JsonOutput::new(report, scan, exit_code).write_to(out, true)?,
        OutputFormat::Csv => CsvOutput::new(report).write_to(out)?,
    }
    Ok(())
}

/// Ledger progress printed by `status`.
#[derive(Debug, Serialize)]
struct LedgerStatus {
    ledger_path: String,
    exists: bool,
    root: Option<String>,
    directories: usize,
    processed: usize,
    pending: usize,
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn run_status(mut config: Config, args: &StatusArgs) -> Result<ExitCode> {
    config.apply_status_args(args);

    let outcome = Ledger::load(&config.ledger_path)
        .with_context(|| format!("Failed to read ledger {}", config.ledger_path.display()))?;
    let exists = matches!(outcome, LoadOutcome::Resumed(_));
    let ledger = outcome.into_ledger();

    let status = LedgerStatus {
        ledger_path: config.ledger_path.display().to_string(),
        exists,
        root: ledger.root.clone(),
        directories: ledger.len(),
        processed: ledger.processed_count(),
        pending: ledger.pending_count(),
        updated_at: exists.then_some(ledger.updated_at),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &status)?;
        writeln!(out)?;
    } else if !status.exists {
        writeln!(out, "No ledger at {}; the next scan starts fresh.", status.ledger_path)?;
    } else {
        writeln!(out, "Ledger:      {}", status.ledger_path)?;
        if let Some(root) = &status.root {
            writeln!(out, "Root:        {}", root)?;
        }
        writeln!(
            out,
            "Directories: {} processed, {} pending, {} total",
            status.processed, status.pending, status.directories
        )?;
        writeln!(out, "Updated:     {}", ledger.updated_at.to_rfc3339())?;
    }
    Ok(ExitCode::Success)
}
