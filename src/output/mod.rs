//! Run summary rendering.
//!
//! [`RunSummary`] combines the dedup and organize results and renders them
//! as text for terminals or JSON for scripting.
//!
//! # JSON schema
//!
//! ```json
//! {
//!   "sources": ["/media/card"],
//!   "destination": "/library",
//!   "total_files": 120,
//!   "unique_files": 97,
//!   "duplicate_files": 23,
//!   "skipped": [{"path": "/media/card/bad.jpg", "reason": "..."}],
//!   "copied": 97,
//!   "copy_failures": [],
//!   "unknown_dates": 4,
//!   "duration_ms": 1234,
//!   "interrupted": false,
//!   "exit_code": 0,
//!   "exit_code_name": "PO000",
//!   "plans": [{"source": "...", "destination": "...", "date": {"Known": "2019-07-04T15:30:00"}}]
//! }
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use bytesize::ByteSize;
use serde::Serialize;

use crate::duplicates::{DedupSummary, SkippedFile};
use crate::error::ExitCode;
use crate::organize::{OrganizeSummary, PlannedCopy};

/// Everything a completed run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Source roots, in command-line order
    pub sources: Vec<PathBuf>,
    /// Destination root
    pub destination: PathBuf,
    /// Paths discovered and handed to the workers
    pub total_files: usize,
    /// Paths successfully fingerprinted
    pub fingerprinted: usize,
    /// Content-unique files kept
    pub unique_files: usize,
    /// Duplicates dropped in total
    pub duplicate_files: usize,
    /// Duplicates dropped inside a partition
    pub partition_duplicates: usize,
    /// Duplicates dropped while merging partitions
    pub merge_duplicates: usize,
    /// Exact comparisons performed by the workers
    pub comparisons: usize,
    /// Partition workers used
    pub partitions: usize,
    /// Files skipped during deduplication
    pub skipped: Vec<SkippedFile>,
    /// Files copied
    pub copied: usize,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Copies that failed
    pub copy_failures: Vec<SkippedFile>,
    /// Unique files without a capture date
    pub unknown_dates: usize,
    /// Copies not started because of an interruption
    pub not_attempted: usize,
    /// Whether nothing was written
    pub dry_run: bool,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "PO000")
    pub exit_code_name: String,
    /// Planned copies, in plan order
    pub plans: Vec<PlannedCopy>,
}

impl RunSummary {
    /// Build a summary from the two phases.
    #[must_use]
    pub fn new(
        sources: Vec<PathBuf>,
        destination: PathBuf,
        dedup: &DedupSummary,
        organize: OrganizeSummary,
        duration: Duration,
    ) -> Self {
        let mut summary = Self {
            sources,
            destination,
            total_files: dedup.total_files,
            fingerprinted: dedup.fingerprinted,
            unique_files: dedup.unique_files,
            duplicate_files: dedup.duplicate_files(),
            partition_duplicates: dedup.partition_duplicates,
            merge_duplicates: dedup.merge_duplicates,
            comparisons: dedup.comparisons,
            partitions: dedup.partitions,
            skipped: dedup.skipped.clone(),
            copied: organize.copied,
            bytes_copied: organize.bytes_copied,
            copy_failures: organize.failed,
            unknown_dates: organize.unknown_dates,
            not_attempted: organize.not_attempted,
            dry_run: organize.dry_run,
            duration_ms: duration.as_millis() as u64,
            interrupted: dedup.interrupted || organize.not_attempted > 0,
            exit_code: 0,
            exit_code_name: String::new(),
            plans: organize.plans,
        };
        let code = summary.exit_code();
        summary.exit_code = code.as_i32();
        summary.exit_code_name = code.code_prefix().to_string();
        summary
    }

    /// Per-file failures across both phases.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.skipped.len() + self.copy_failures.len()
    }

    /// Exit code implied by this summary.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::for_outcome(self.interrupted, self.failures())
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON form followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_json<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write the human-readable form.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        if self.dry_run {
            for plan in &self.plans {
                writeln!(
                    writer,
                    "{} -> {}",
                    plan.source.display(),
                    plan.destination.display()
                )?;
            }
            if !self.plans.is_empty() {
                writeln!(writer)?;
            }
        }

        writeln!(writer, "Files seen:       {}", self.total_files)?;
        writeln!(
            writer,
            "Unique kept:      {} ({} duplicates dropped, {} across partitions)",
            self.unique_files, self.duplicate_files, self.merge_duplicates
        )?;
        if self.dry_run {
            writeln!(writer, "Would copy:       {}", self.plans.len())?;
        } else {
            writeln!(
                writer,
                "Copied:           {} ({})",
                self.copied,
                ByteSize::b(self.bytes_copied)
            )?;
        }
        writeln!(writer, "Unknown date:     {}", self.unknown_dates)?;
        writeln!(
            writer,
            "Duration:         {:.2}s",
            self.duration_ms as f64 / 1000.0
        )?;

        if !self.skipped.is_empty() {
            writeln!(writer, "\nSkipped ({}):", self.skipped.len())?;
            for file in &self.skipped {
                writeln!(writer, "  {}: {}", file.path.display(), file.reason)?;
            }
        }
        if !self.copy_failures.is_empty() {
            writeln!(writer, "\nCopy failures ({}):", self.copy_failures.len())?;
            for file in &self.copy_failures {
                writeln!(writer, "  {}: {}", file.path.display(), file.reason)?;
            }
        }
        if self.interrupted {
            writeln!(
                writer,
                "\nInterrupted: results cover only the files processed before Ctrl+C."
            )?;
        }
        Ok(())
    }
}

/// Errors that can occur while writing a summary.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing summary: {0}")]
    Io(#[from] std::io::Error),
}
