//! Command-line interface definitions for hashledger.
//!
//! Global options (verbosity, color, config file) apply to every subcommand.
//! Values given here override the configuration file and `HASHLEDGER_*`
//! environment variables.
//!
//! # Example
//!
//! ```bash
//! # Scan (or resume scanning) the current directory
//! hashledger scan
//!
//! # Scan with explicit checkpoint files, JSON report
//! hashledger scan ~/Photos --ledger photos.dirs --results photos.tsv --output json
//!
//! # Recompute the duplicate report from the results file only
//! hashledger report --results photos.tsv --limit 500
//!
//! # Show how far a scan got
//! hashledger status --ledger photos.dirs
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::engine::ErrorPolicy;

/// Resumable content-hash scanner and duplicate finder.
///
/// hashledger hashes every regular file under a directory with BLAKE3,
/// checkpointing per directory so an interrupted scan resumes where it
/// stopped, and reports files with identical content.
#[derive(Debug, Parser)]
#[command(name = "hashledger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML); defaults to the platform config directory
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan (or resume scanning) a directory tree and report duplicates
    Scan(ScanArgs),
    /// Report duplicates from an existing results file without scanning
    Report(ReportArgs),
    /// Show ledger progress
    Status(StatusArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Default, Args)]
pub struct ScanArgs {
    /// Directory to scan [default: .]
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Ledger file recording processed directories
    #[arg(long, visible_alias = "savedirs", value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Results file (tab-separated path, size, hash)
    #[arg(long, visible_alias = "savehashes", value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Checkpoint when more than N records are pending
    #[arg(long, value_name = "N")]
    pub flush_threshold: Option<usize>,

    /// Files at or above this size are hashed in chunks (e.g. 100KB, 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub large_file_threshold: Option<u64>,

    /// What to do when a file or directory cannot be read
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_error: Option<ErrorPolicy>,

    /// Output format for the duplicate report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Maximum number of report rows
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Skip the duplicate report after scanning
    #[arg(long)]
    pub no_report: bool,
}

/// Arguments for the report subcommand.
#[derive(Debug, Default, Args)]
pub struct ReportArgs {
    /// Results file to read
    #[arg(long, visible_alias = "savehashes", value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Maximum number of report rows
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

/// Arguments for the status subcommand.
#[derive(Debug, Default, Args)]
pub struct StatusArgs {
    /// Ledger file to inspect
    #[arg(long, visible_alias = "savedirs", value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Print status as JSON
    #[arg(long)]
    pub json: bool,
}

/// Output format for duplicate reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use hashledger::cli::parse_size;
///
/// assert_eq!(parse_size("100000").unwrap(), 100_000);
/// assert_eq!(parse_size("100KB").unwrap(), 100_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// or has an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
