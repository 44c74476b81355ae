//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the photo-organizer application.
///
/// - 0: Success (every discovered file deduplicated and copied)
/// - 1: General error (bad arguments, traversal or merge failure)
/// - 3: Partial success (some files skipped or failed to copy)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed without per-file failures.
    Success = 0,
    /// General error: the run was aborted.
    GeneralError = 1,
    /// Partial success: the run completed but some files were skipped.
    PartialSuccess = 3,
    /// Interrupted: the run was stopped by the user (Ctrl+C).
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
            Self::Success => "PO000",
            Self::GeneralError => "PO001",
            Self::PartialSuccess => "PO003",
            Self::Interrupted => "PO130",
        }
    }

    /// Exit code for a completed run.
    ///
    /// Interruption takes precedence over per-file failures.
    #[must_use]
    pub fn for_outcome(interrupted: bool, failures: usize) -> Self {
        if interrupted {
            Self::Interrupted
        } else if failures > 0 {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "PO001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
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
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
