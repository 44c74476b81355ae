//! Dedup engine: fan-out over partition workers, fan-in through the merge.
//!
//! # Overview
//!
//! This module orchestrates the content-dedup pipeline:
//! 1. **Discovery** - The caller's path iterator (normally one [`Walker`] per
//!    source root) runs on the calling thread as the single producer.
//! 2. **Scan** - Paths go through one bounded channel to N partition workers,
//!    each building a private registry. A full channel blocks the producer,
//!    so discovery never runs far ahead of processing.
//! 3. **Merge** - Once every worker has been joined, their results are folded
//!    into one global registry in the order they became available.
//!
//! Which path survives among a set of duplicates depends on scheduling and is
//! unspecified. The set of distinct contents does not.
//!
//! # Example
//!
//! ```no_run
//! use photo_organizer::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_workers(4));
//! let report = finder
//!     .find_unique_in_roots(&[PathBuf::from("/media/camera")])
//!     .unwrap();
//!
//! println!(
//!     "{} files seen, {} unique",
//!     report.summary.total_files, report.summary.unique_files
//! );
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded};

use super::compare::{CompareError, ExactComparator};
use super::merge::merge_partitions;
use super::partition::{PartitionContext, PartitionResult, PartitionWorker, SkippedFile};
use super::registry::Registry;
use crate::progress::ProgressCallback;
use crate::scanner::{Fingerprinter, ScanError, Walker, WalkerConfig, DEFAULT_PREFIX_SIZE};

/// Default capacity of the distribution channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Number of workers used when none is configured: one per available CPU.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Configuration for the dedup engine.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of partition workers. Zero means one per available CPU.
    pub workers: usize,
    /// Capacity of the distribution channel. Zero makes every send a
    /// rendezvous with a ready worker.
    pub queue_capacity: usize,
    /// Bytes hashed for each fingerprint.
    pub fingerprint_prefix: usize,
    /// Walker configuration used by [`DuplicateFinder::find_unique_in_roots`].
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("fingerprint_prefix", &self.fingerprint_prefix)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fingerprint_prefix: DEFAULT_PREFIX_SIZE,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of partition workers (0 = one per CPU).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the distribution channel capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the fingerprint prefix length in bytes.
    #[must_use]
    pub fn with_fingerprint_prefix(mut self, bytes: usize) -> Self {
        self.fingerprint_prefix = bytes;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Worker count after resolving the automatic default.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            default_workers()
        } else {
            self.workers
        }
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a dedup run.
#[derive(Debug, Clone, Default)]
pub struct DedupSummary {
    /// Paths handed to the workers
    pub total_files: usize,
    /// Paths successfully fingerprinted
    pub fingerprinted: usize,
    /// Unique representatives in the global registry
    pub unique_files: usize,
    /// Duplicates rejected inside a single partition
    pub partition_duplicates: usize,
    /// Duplicates rejected while merging partitions
    pub merge_duplicates: usize,
    /// Exact comparisons performed by the workers
    pub comparisons: usize,
    /// Number of partitions (workers)
    pub partitions: usize,
    /// Paths skipped because of I/O errors
    pub skipped: Vec<SkippedFile>,
    /// Duration of the whole run
    pub duration: Duration,
    /// Whether discovery stopped early because of a shutdown request
    pub interrupted: bool,
}

impl DedupSummary {
    /// Total duplicates dropped, within and across partitions.
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.partition_duplicates + self.merge_duplicates
    }
}

/// The global registry plus statistics about how it was built.
#[derive(Debug)]
pub struct DedupReport {
    /// Read-only global registry of unique media
    pub registry: Registry,
    /// Statistics about the run
    pub summary: DedupSummary,
}

/// Errors that abort a dedup run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// Enumerating a source root failed.
    #[error("Traversal failed: {0}")]
    Traversal(#[from] ScanError),

    /// A comparison failed while merging partitions.
    #[error("Merge failed: {0}")]
    Merge(#[from] CompareError),

    /// A worker thread could not be started.
    #[error("Failed to spawn partition worker {id}: {source}")]
    WorkerSpawn {
        /// Worker ID
        id: usize,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("Partition worker {id} panicked")]
    WorkerPanicked {
        /// Worker ID
        id: usize,
    },
}

/// Dedup engine running the partition/merge pipeline.
///
/// # Example
///
/// ```no_run
/// use photo_organizer::duplicates::DuplicateFinder;
/// use std::path::PathBuf;
///
/// let finder = DuplicateFinder::with_defaults();
/// let paths = vec![Ok(PathBuf::from("a.jpg")), Ok(PathBuf::from("b.jpg"))];
/// let report = finder.find_unique(paths).unwrap();
/// for media in report.registry.iter() {
///     println!("{}", media.path().display());
/// }
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Walk every root in order and deduplicate the media found.
    ///
    /// # Errors
    ///
    /// See [`DuplicateFinder::find_unique`].
    pub fn find_unique_in_roots(&self, roots: &[PathBuf]) -> Result<DedupReport, FinderError> {
        let walkers: Vec<Walker> = roots
            .iter()
            .map(|root| {
                let walker = Walker::new(root, self.config.walker_config.clone());
                match self.config.shutdown_flag {
                    Some(ref flag) => walker.with_shutdown_flag(Arc::clone(flag)),
                    None => walker,
                }
            })
            .collect();

        for walker in &walkers {
            log::info!("Scanning {}", walker.root().display());
        }

        self.find_unique(walkers.iter().flat_map(|walker| walker.walk()))
    }

    /// Deduplicate the paths produced by `paths`.
    ///
    /// The iterator is drained on the calling thread. The first `Err` it
    /// yields stops production; workers still drain what was already queued
    /// and are joined before the error is returned.
    ///
    /// A shutdown request also stops production, but the partitions built so
    /// far are merged and returned with `summary.interrupted` set.
    ///
    /// # Errors
    ///
    /// - [`FinderError::Traversal`] if `paths` yields an error
    /// - [`FinderError::Merge`] if a comparison fails during the merge
    /// - [`FinderError::WorkerSpawn`] / [`FinderError::WorkerPanicked`] on thread failures
    pub fn find_unique<I>(&self, paths: I) -> Result<DedupReport, FinderError>
    where
        I: IntoIterator<Item = Result<PathBuf, ScanError>>,
    {
        let start_time = Instant::now();
        let workers = self.config.effective_workers();

        let mut context = PartitionContext::new(
            Fingerprinter::new(self.config.fingerprint_prefix),
            ExactComparator::default(),
        );
        if let Some(ref callback) = self.config.progress_callback {
            context = context.with_progress_callback(Arc::clone(callback));
            callback.on_phase_start("scan", 0);
        }
        let context = Arc::new(context);

        log::info!(
            "Deduplicating with {} workers (queue capacity {})",
            workers,
            self.config.queue_capacity
        );

        let (path_tx, path_rx) = bounded::<PathBuf>(self.config.queue_capacity);
        let (result_tx, result_rx) = unbounded::<PartitionResult>();

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            match PartitionWorker::spawn(
                id,
                path_rx.clone(),
                result_tx.clone(),
                Arc::clone(&context),
            ) {
                Ok(worker) => handles.push(worker),
                Err(e) => {
                    // Let the workers already started see a closed channel.
                    drop(path_tx);
                    join_workers(handles)?;
                    return Err(e);
                }
            }
        }
        // Workers hold the only remaining clones.
        drop(path_rx);
        drop(result_tx);

        let mut total_files = 0usize;
        let mut traversal_error = None;
        let mut interrupted = false;

        for item in paths {
            if self.config.is_shutdown_requested() {
                interrupted = true;
                break;
            }
            match item {
                Ok(path) => {
                    if path_tx.send(path).is_err() {
                        log::error!("All partition workers exited early");
                        break;
                    }
                    total_files += 1;
                }
                Err(e) => {
                    log::error!("Stopping discovery: {}", e);
                    traversal_error = Some(e);
                    break;
                }
            }
        }
        interrupted |= self.config.is_shutdown_requested();
        drop(path_tx);

        // Arrival order is the merge order.
        let results: Vec<PartitionResult> = result_rx.iter().collect();
        join_workers(handles)?;

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("scan");
        }

        if let Some(e) = traversal_error {
            return Err(FinderError::Traversal(e));
        }
        if interrupted {
            log::info!("Discovery interrupted; merging {} partitions", results.len());
        }

        let mut summary = DedupSummary {
            total_files,
            partitions: results.len(),
            interrupted,
            ..Default::default()
        };
        for result in &results {
            summary.fingerprinted += result.stats.fingerprinted;
            summary.partition_duplicates += result.stats.registry.duplicates;
            summary.comparisons += result.stats.registry.comparisons;
            summary.skipped.extend(result.stats.skipped.iter().cloned());
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("merge", results.len());
        }
        let (registry, merge_stats) = merge_partitions(results, ExactComparator::default())?;
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("merge");
        }

        summary.merge_duplicates = merge_stats.cross_partition_duplicates;
        summary.unique_files = registry.len();
        // A request that lands while workers drain or during the merge still counts.
        summary.interrupted |= self.config.is_shutdown_requested();
        summary.duration = start_time.elapsed();

        log::info!(
            "Dedup complete: {} files, {} unique, {} duplicates, {} skipped",
            summary.total_files,
            summary.unique_files,
            summary.duplicate_files(),
            summary.skipped.len()
        );

        Ok(DedupReport { registry, summary })
    }
}

/// Join every worker, reporting the first failure after all have stopped.
fn join_workers(workers: Vec<PartitionWorker>) -> Result<(), FinderError> {
    let mut first_error = None;
    for worker in workers {
        if let Err(e) = worker.join() {
            log::error!("{}", e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
