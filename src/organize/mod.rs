//! Organizing unique media into a dated destination tree.
//!
//! This module provides functionality for:
//! - Capture date resolution ([`DateResolver`])
//! - Destination path planning ([`PathPlanner`])
//! - Copying planned files ([`Writer`])
//!
//! [`Organizer`] runs the three steps over the representatives of a
//! deduplicated registry.

pub mod date;
pub mod planner;
pub mod writer;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::duplicates::{Media, SkippedFile};
use crate::progress::ProgressCallback;

pub use date::{
    CaptureDate, DateResolver, DateSource, FileSystemMetadata, MetadataField, MetadataSource,
    ResolvedDate,
};
pub use planner::{PathPlanner, PlannedCopy, UNKNOWN_DIR};
pub use writer::{copy_planned, WriteError, WriteSummary, Writer, WriterConfig, DEFAULT_IO_THREADS};

/// Run `op` inside a pool of `threads` workers, or on the global pool if one
/// cannot be built.
pub(crate) fn run_in_pool<R, F>(threads: usize, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(op),
        Err(e) => {
            log::warn!(
                "Failed to create I/O thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            op()
        }
    }
}

/// Settings for [`Organizer`].
#[derive(Clone)]
pub struct OrganizeConfig {
    /// Destination root
    pub destination: PathBuf,
    /// Concurrent I/O operations for date resolution and copying
    pub io_threads: usize,
    /// Plan and log without copying
    pub dry_run: bool,
    /// Treat files already in the destination as taken
    pub keep_existing: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for OrganizeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizeConfig")
            .field("destination", &self.destination)
            .field("io_threads", &self.io_threads)
            .field("dry_run", &self.dry_run)
            .field("keep_existing", &self.keep_existing)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl OrganizeConfig {
    /// Defaults for the given destination.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            io_threads: DEFAULT_IO_THREADS,
            dry_run: false,
            keep_existing: false,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the I/O pool size.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Enable or disable dry run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Keep existing destination files and plan around them.
    #[must_use]
    pub fn with_keep_existing(mut self, keep: bool) -> Self {
        self.keep_existing = keep;
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
}

/// What an organize run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizeSummary {
    /// Every planned copy, in plan order
    pub plans: Vec<PlannedCopy>,
    /// Files copied
    pub copied: usize,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Copies that failed
    pub failed: Vec<SkippedFile>,
    /// Files placed under the unknown-date directory
    pub unknown_dates: usize,
    /// Copies never started because of a shutdown request
    pub not_attempted: usize,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// Resolves, plans and copies unique media.
#[derive(Debug)]
pub struct Organizer {
    config: OrganizeConfig,
    resolver: DateResolver,
}

impl Organizer {
    /// Create an organizer using filesystem metadata only.
    #[must_use]
    pub fn new(config: OrganizeConfig) -> Self {
        Self {
            config,
            resolver: DateResolver::default(),
        }
    }

    /// Use a different date resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: DateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// Resolve dates and assign destinations, without touching the destination.
    ///
    /// Media are planned in path order.
    pub fn plan<'a, I>(&self, media: I) -> Vec<PlannedCopy>
    where
        I: IntoIterator<Item = &'a Media>,
    {
        let mut media: Vec<&Media> = media.into_iter().collect();
        media.sort_by(|a, b| a.path().cmp(b.path()));

        let resolver = &self.resolver;
        let dates: Vec<CaptureDate> = run_in_pool(self.config.io_threads, || {
            media
                .par_iter()
                .map(|m| {
                    let resolved = resolver.resolve(m.path());
                    log::trace!(
                        "{}: {:?} from {:?}",
                        m.path().display(),
                        resolved.date,
                        resolved.source
                    );
                    resolved.date
                })
                .collect()
        });

        let mut planner = PathPlanner::new(&self.config.destination)
            .with_avoid_existing(self.config.keep_existing);
        media
            .iter()
            .zip(dates)
            .map(|(m, date)| planner.plan(m, date))
            .collect()
    }

    /// Plan and copy every representative.
    pub fn organize<'a, I>(&self, media: I) -> OrganizeSummary
    where
        I: IntoIterator<Item = &'a Media>,
    {
        let plans = self.plan(media);
        let unknown_dates = plans.iter().filter(|p| p.date.is_unknown()).count();
        log::info!(
            "Planned {} copies into {} ({} without a date)",
            plans.len(),
            self.config.destination.display(),
            unknown_dates
        );

        let writer = Writer::new(WriterConfig {
            io_threads: self.config.io_threads,
            dry_run: self.config.dry_run,
            shutdown_flag: self.config.shutdown_flag.clone(),
            progress_callback: self.config.progress_callback.clone(),
        });
        let written = writer.write_all(&plans);

        OrganizeSummary {
            plans,
            copied: written.copied,
            bytes_copied: written.bytes_copied,
            failed: written.failed,
            unknown_dates,
            not_attempted: written.not_attempted,
            dry_run: self.config.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::fingerprint_bytes;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct NoMetadata;

    impl MetadataSource for NoMetadata {
        fn field(&self, _path: &Path, _field: MetadataField) -> Option<String> {
            None
        }
    }

    fn media(dir: &Path, rel: &str, bytes: &[u8]) -> Media {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, bytes).unwrap();
        Media::with_fingerprint(path, fingerprint_bytes(bytes))
    }

    #[test]
    fn test_organize_layout() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let a = media(src.path(), "2019/7/a.jpg", b"alpha");
        let b = media(src.path(), "misc/b.png", b"beta");

        let organizer = Organizer::new(OrganizeConfig::new(dst.path()))
            .with_resolver(DateResolver::new(Box::new(NoMetadata)));
        let summary = organizer.organize([&a, &b]);

        assert_eq!(summary.copied, 2);
        assert_eq!(summary.unknown_dates, 1);
        assert!(summary.failed.is_empty());
        assert!(dst
            .path()
            .join(format!("2019/7/{}.jpg", fingerprint_bytes(b"alpha")))
            .exists());
        assert!(dst
            .path()
            .join(format!("unknown/{}.png", fingerprint_bytes(b"beta")))
            .exists());
    }

    #[test]
    fn test_plan_is_path_ordered() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let z = Media::with_fingerprint(src.path().join("z.jpg"), 1);
        let a = Media::with_fingerprint(src.path().join("a.jpg"), 1);

        let organizer = Organizer::new(OrganizeConfig::new(dst.path()))
            .with_resolver(DateResolver::new(Box::new(NoMetadata)));
        let plans = organizer.plan([&z, &a]);

        assert_eq!(plans[0].source, src.path().join("a.jpg"));
        assert_eq!(plans[0].destination, dst.path().join("unknown/1.jpg"));
        assert_eq!(plans[1].destination, dst.path().join("unknown/1-1.jpg"));
    }

    #[test]
    fn test_dry_run_summary() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let a = media(src.path(), "a.jpg", b"alpha");

        let organizer = Organizer::new(OrganizeConfig::new(dst.path().join("out")).with_dry_run(true));
        let summary = organizer.organize([&a]);

        assert!(summary.dry_run);
        assert_eq!(summary.plans.len(), 1);
        assert_eq!(summary.copied, 0);
        assert!(!dst.path().join("out").exists());
    }
}
