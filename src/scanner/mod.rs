//! Scanner module for media discovery and fingerprinting.
//!
//! This module provides functionality for:
//! - Sequential directory walking with an extension allow-list
//! - Cheap prefix fingerprints (FNV-1a, 32-bit) used to bucket candidate duplicates
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and media file discovery
//! - [`hasher`]: Prefix fingerprinting
//!
//! # Example
//!
//! ```no_run
//! use photo_organizer::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Traversal failed: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use hasher::{fingerprint_bytes, Fingerprint, Fingerprinter, DEFAULT_PREFIX_SIZE};
pub use walker::Walker;

/// Media extensions accepted when no allow-list is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "mp4", "mpeg", "mov", "svg"];

/// Configuration for directory walking.
///
/// Controls the extension allow-list, symlink handling, and other walk behavior.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Extensions (without the leading dot) accepted as media.
    /// Matching is case-insensitive.
    pub extensions: Vec<String>,

    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            follow_symlinks: false,
            skip_hidden: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
        }
    }
}

impl WalkerConfig {
    /// Replace the extension allow-list.
    ///
    /// Leading dots are stripped, so `".jpg"` and `"jpg"` are equivalent.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Check whether an extension (without the dot) is on the allow-list.
    #[must_use]
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

/// Errors that can occur while enumerating a source root.
///
/// Any of these is fatal to a run: the input set would otherwise be of
/// unknown extent.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A symlink cycle was detected while following links.
    #[error("Filesystem loop detected at {0}")]
    Loop(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while fingerprinting a single media file.
///
/// These are recoverable: the offending path is skipped and the scan continues.
#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    /// The file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading the file failed before end-of-stream.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } => path,
        }
    }
}
