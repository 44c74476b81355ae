//! Partition workers.
//!
//! Each worker pulls paths from the shared distribution channel, fingerprints
//! them and adds them to its own private [`Registry`]. Workers share no
//! mutable state with each other; the only shared structure during the scan
//! is the channel itself.
//!
//! A path that cannot be fingerprinted, or whose comparison fails inside the
//! worker, is logged and skipped. It never stops the worker.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use super::compare::ExactComparator;
use super::finder::FinderError;
use super::registry::{Registry, RegistryStats};
use super::Media;
use crate::progress::ProgressCallback;
use crate::scanner::Fingerprinter;

/// A path that was dropped from the scan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// Path that was skipped
    pub path: PathBuf,
    /// Human-readable reason
    pub reason: String,
}

/// Settings and shared counters handed to every worker.
pub struct PartitionContext {
    /// Fingerprinter used for every path
    pub fingerprinter: Fingerprinter,
    /// Comparator used by the private registries
    pub comparator: ExactComparator,
    /// Optional progress callback
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Paths pulled from the channel so far, across all workers
    processed: AtomicUsize,
}

impl std::fmt::Debug for PartitionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionContext")
            .field("fingerprinter", &self.fingerprinter)
            .field("comparator", &self.comparator)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("processed", &self.processed)
            .finish()
    }
}

impl Default for PartitionContext {
    fn default() -> Self {
        Self::new(Fingerprinter::default(), ExactComparator::default())
    }
}

impl PartitionContext {
    /// Create a context without progress reporting.
    #[must_use]
    pub fn new(fingerprinter: Fingerprinter, comparator: ExactComparator) -> Self {
        Self {
            fingerprinter,
            comparator,
            progress_callback: None,
            processed: AtomicUsize::new(0),
        }
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Paths pulled from the channel so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    fn record_path(&self, path: &std::path::Path) {
        let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(current, path.to_string_lossy().as_ref());
        }
    }
}

/// Counters for one partition.
#[derive(Debug, Clone, Default)]
pub struct PartitionStats {
    /// Paths received from the channel
    pub received: usize,
    /// Paths successfully fingerprinted
    pub fingerprinted: usize,
    /// Paths dropped because of I/O errors
    pub skipped: Vec<SkippedFile>,
    /// Counters from the private registry
    pub registry: RegistryStats,
}

/// What a worker publishes when its input is exhausted.
#[derive(Debug)]
pub struct PartitionResult {
    /// Worker that produced this result
    pub worker_id: usize,
    /// Unique representatives, in the order the worker accepted them
    pub representatives: Vec<Media>,
    /// Counters for this partition
    pub stats: PartitionStats,
}

/// Build one partition's registry from a sequence of paths.
///
/// This is the body of every worker thread; it is public so a partition can
/// be built synchronously from any path list.
pub fn run_partition<I>(worker_id: usize, paths: I, context: &PartitionContext) -> PartitionResult
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut registry = Registry::with_comparator(context.comparator);
    let mut stats = PartitionStats::default();

    for path in paths {
        stats.received += 1;
        context.record_path(&path);

        let media = match Media::open(path, &context.fingerprinter) {
            Ok(media) => media,
            Err(e) => {
                log::warn!("Skipping {}: {}", e.path().display(), e);
                stats.skipped.push(SkippedFile {
                    path: e.path().to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        stats.fingerprinted += 1;

        let path = media.path().to_path_buf();
        if let Err(e) = registry.add(media) {
            log::warn!("Skipping {}: {}", path.display(), e);
            stats.skipped.push(SkippedFile {
                path,
                reason: e.to_string(),
            });
        }
    }

    stats.registry = registry.stats();
    log::debug!(
        "Partition {}: {} paths, {} unique, {} skipped",
        worker_id,
        stats.received,
        registry.len(),
        stats.skipped.len()
    );

    PartitionResult {
        worker_id,
        representatives: registry.into_representatives(),
        stats,
    }
}

/// A worker thread consuming the distribution channel.
pub struct PartitionWorker {
    /// Worker ID
    id: usize,
    /// Thread handle
    handle: Option<JoinHandle<()>>,
}

impl PartitionWorker {
    /// Spawn a worker that drains `paths` and publishes its result on `results`.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::WorkerSpawn`] if the thread cannot be created.
    pub fn spawn(
        id: usize,
        paths: Receiver<PathBuf>,
        results: Sender<PartitionResult>,
        context: Arc<PartitionContext>,
    ) -> Result<Self, FinderError> {
        let handle = thread::Builder::new()
            .name(format!("partition-{}", id))
            .spawn(move || {
                // Ends once every sender is dropped and the channel is empty.
                let result = run_partition(id, paths.iter(), &context);
                if results.send(result).is_err() {
                    log::debug!("Partition {}: coordinator gone, result dropped", id);
                }
            })
            .map_err(|source| FinderError::WorkerSpawn { id, source })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Worker ID.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to finish.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::WorkerPanicked`] if the thread panicked.
    pub fn join(mut self) -> Result<(), FinderError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| FinderError::WorkerPanicked { id: self.id }),
            None => Ok(()),
        }
    }
}
