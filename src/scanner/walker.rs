//! Directory walker for media discovery.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, which traverses one source
//! root with [`walkdir`] and yields the paths of files whose extension is on
//! the media allow-list. Discovery is deliberately sequential: the walker is
//! the single producer feeding the partition workers.
//!
//! # Features
//!
//! - Sorted, deterministic traversal order
//! - Case-insensitive extension allow-list
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Size filtering (min/max)
//! - Hidden file filtering
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use photo_organizer::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/media/camera"), WalkerConfig::default());
//! let paths: Vec<_> = walker.walk().collect::<Result<_, _>>().unwrap();
//! println!("Found {} media files", paths.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{ScanError, WalkerConfig};

/// Directory walker for media file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding paths.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root directory this walker traverses.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Ensure the root exists and is a directory.
    fn validate_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) => Err(self.map_io_error(&self.root, e)),
        }
    }

    /// Build gitignore matcher from config patterns and .gitignore file.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        let gitignore_path = self.root.join(".gitignore");
        if gitignore_path.exists() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            } else {
                log::debug!("Loaded .gitignore from {}", gitignore_path.display());
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check if a path should be ignored based on configured patterns.
    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: Option<&Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };

        let relative_path = path.strip_prefix(&self.root).unwrap_or(path);
        let path_str = relative_path.to_string_lossy();
        let normalized_path = if cfg!(windows) {
            path_str.replace('\\', "/")
        } else {
            path_str.into_owned()
        };

        gi.matched(normalized_path, is_dir).is_ignore()
    }

    /// Whether a walk entry should be descended into / considered at all.
    fn keep_entry(&self, entry: &DirEntry, gitignore: Option<&Gitignore>) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        if self.config.skip_hidden
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
        {
            log::trace!("Skipping hidden entry: {}", entry.path().display());
            return false;
        }

        if self.should_ignore(entry.path(), entry.file_type().is_dir(), gitignore) {
            log::trace!("Ignoring entry: {}", entry.path().display());
            return false;
        }

        true
    }

    /// Check if a file passes the extension allow-list.
    fn passes_extension_filter(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.config.accepts_extension(ext))
    }

    /// Check if a file size passes the configured filters.
    fn passes_size_filter(&self, size: u64) -> bool {
        if self.config.min_size.is_some_and(|min| size < min) {
            return false;
        }
        if self.config.max_size.is_some_and(|max| size > max) {
            return false;
        }
        true
    }

    /// Walk the directory tree, yielding media file paths.
    ///
    /// Errors are yielded as [`ScanError`] values. Callers treat any error as
    /// fatal for the run; the walker itself does not stop on the first one.
    pub fn walk(&self) -> Box<dyn Iterator<Item = Result<PathBuf, ScanError>> + '_> {
        if let Err(e) = self.validate_root() {
            return Box::new(std::iter::once(Err(e)));
        }

        let gitignore = self.build_gitignore();

        let entries = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.keep_entry(entry, gitignore.as_ref()));

        Box::new(
            entries
                .take_while(move |_| {
                    if self.is_shutdown_requested() {
                        log::debug!("Walker: Shutdown requested, stopping iteration");
                        return false;
                    }
                    true
                })
                .filter_map(move |entry_result| match entry_result {
                    Ok(entry) => self.process_entry(entry),
                    Err(e) => Some(Err(self.map_walkdir_error(e))),
                }),
        )
    }

    /// Turn a walk entry into a media path, if it qualifies.
    fn process_entry(&self, entry: DirEntry) -> Option<Result<PathBuf, ScanError>> {
        if !entry.file_type().is_file() {
            // With follow_links enabled walkdir reports the target's type,
            // so only dangling or unfollowed symlinks land here.
            return None;
        }

        if !self.passes_extension_filter(entry.path()) {
            log::trace!("Skipping non-media file: {}", entry.path().display());
            return None;
        }

        if self.config.min_size.is_some() || self.config.max_size.is_some() {
            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => return Some(Err(self.map_walkdir_error(e))),
            };
            if !self.passes_size_filter(size) {
                log::trace!(
                    "Skipping file due to size filter ({}): {}",
                    size,
                    entry.path().display()
                );
                return None;
            }
        }

        Some(Ok(entry.into_path()))
    }

    /// Map an I/O error for `path` to a [`ScanError`].
    fn map_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
            _ => ScanError::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Map a walkdir error to a [`ScanError`].
    fn map_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        log::warn!("Walker error for {}: {}", path.display(), error);

        if error.loop_ancestor().is_some() {
            return ScanError::Loop(path);
        }

        match error.into_io_error() {
            Some(io) => self.map_io_error(&path, io),
            None => ScanError::Io {
                path,
                source: std::io::Error::other("directory walk failed"),
            },
        }
    }
}
