//! Copying planned files into the destination tree.
//!
//! Copies run on a bounded rayon pool. A failed copy is logged and recorded;
//! it never stops the others. Once shutdown is requested no further copies
//! are started.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::planner::PlannedCopy;
use super::run_in_pool;
use crate::duplicates::SkippedFile;
use crate::progress::ProgressCallback;

/// Default number of concurrent copies.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Errors from copying a single file.
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The destination directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The copy itself failed.
    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        /// Source file
        from: PathBuf,
        /// Destination file
        to: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Copy one planned file, creating parent directories as needed.
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Returns a [`WriteError`] if the directory cannot be created or the copy fails.
pub fn copy_planned(plan: &PlannedCopy) -> Result<u64, WriteError> {
    if let Some(parent) = plan.destination.parent() {
        fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::copy(&plan.source, &plan.destination).map_err(|source| WriteError::Copy {
        from: plan.source.clone(),
        to: plan.destination.clone(),
        source,
    })
}

/// Writer configuration.
#[derive(Clone, Default)]
pub struct WriterConfig {
    /// Concurrent copies (0 = rayon default)
    pub io_threads: usize,
    /// Log what would be copied without touching the filesystem
    pub dry_run: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterConfig")
            .field("io_threads", &self.io_threads)
            .field("dry_run", &self.dry_run)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl WriterConfig {
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Result of writing a batch of planned copies.
#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    /// Files copied (zero in a dry run)
    pub copied: usize,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Copies that failed
    pub failed: Vec<SkippedFile>,
    /// Copies never started because of a shutdown request
    pub not_attempted: usize,
}

enum Outcome {
    Copied(u64),
    DryRun,
    Failed(SkippedFile),
    NotAttempted,
}

/// Parallel copier.
#[derive(Debug, Default)]
pub struct Writer {
    config: WriterConfig,
}

impl Writer {
    /// Create a writer.
    #[must_use]
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Copy every planned file.
    pub fn write_all(&self, plans: &[PlannedCopy]) -> WriteSummary {
        let done = AtomicUsize::new(0);
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("copy", plans.len());
        }

        let outcomes: Vec<Outcome> = run_in_pool(self.config.io_threads, || {
            plans
                .par_iter()
                .map(|plan| self.write_one(plan, &done))
                .collect()
        });

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("copy");
        }

        let mut summary = WriteSummary::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Copied(bytes) => {
                    summary.copied += 1;
                    summary.bytes_copied += bytes;
                }
                Outcome::DryRun => {}
                Outcome::Failed(skipped) => summary.failed.push(skipped),
                Outcome::NotAttempted => summary.not_attempted += 1,
            }
        }

        if summary.not_attempted > 0 {
            log::warn!(
                "Shutdown requested: {} copies not started",
                summary.not_attempted
            );
        }
        summary
    }

    fn write_one(&self, plan: &PlannedCopy, done: &AtomicUsize) -> Outcome {
        if self.config.is_shutdown_requested() {
            return Outcome::NotAttempted;
        }

        let outcome = if self.config.dry_run {
            log::info!(
                "[dry run] {} -> {}",
                plan.source.display(),
                plan.destination.display()
            );
            Outcome::DryRun
        } else {
            match copy_planned(plan) {
                Ok(bytes) => {
                    log::debug!(
                        "Copied {} -> {}",
                        plan.source.display(),
                        plan.destination.display()
                    );
                    Outcome::Copied(bytes)
                }
                Err(e) => {
                    log::error!("{}", e);
                    Outcome::Failed(SkippedFile {
                        path: plan.source.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        };

        self.report(done, &plan.source);
        outcome
    }

    fn report(&self, done: &AtomicUsize, path: &Path) {
        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_progress(current, path.to_string_lossy().as_ref());
        }
    }
}
