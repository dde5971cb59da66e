//! Structured error handling and exit codes.

use serde::Serialize;

use crate::engine::ScanReport;

/// Exit codes for the hashledger binary.
///
/// - 0: Success (run completed, whether or not duplicates were found)
/// - 1: General error (fatal failure)
/// - 3: Partial success (completed, but some entries were skipped)
/// - 130: Interrupted by user (Ctrl+C); progress was checkpointed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed normally.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Partial success: the scan completed but skipped some files or directories.
    PartialSuccess = 3,
    /// Interrupted: the scan was stopped by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "HL000",
            Self::GeneralError => "HL001",
            Self::PartialSuccess => "HL003",
            Self::Interrupted => "HL130",
        }
    }

    /// Exit code for a finished scan run.
    ///
    /// Interruption wins over skipped entries.
    #[must_use]
    pub fn from_scan(report: &ScanReport) -> Self {
        if report.interrupted {
            Self::Interrupted
        } else if report.has_skipped() {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "HL001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Error chain, outermost first
    pub causes: Vec<String>,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
