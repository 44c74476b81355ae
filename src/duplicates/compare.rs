//! Exact content comparison between two media files.
//!
//! Two files that share a fingerprint are read in lockstep, one chunk at a
//! time, and compared without ever buffering either file in full. Both
//! handles are scoped to a single call to [`ExactComparator::compare`], so
//! they are closed on every return path.

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use super::Media;

/// Default number of bytes read from each file per step.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A comparison could not be completed because one of the files failed.
///
/// This is never a "not equal" answer: callers must not treat it as
/// distinct content.
#[derive(thiserror::Error, Debug)]
#[error("Failed to compare {left} with {right}: {source}")]
pub struct CompareError {
    /// First file of the pair
    pub left: PathBuf,
    /// Second file of the pair
    pub right: PathBuf,
    /// The underlying I/O error
    #[source]
    pub source: io::Error,
}

/// Streaming byte-for-byte comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactComparator {
    chunk_size: usize,
}

impl Default for ExactComparator {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ExactComparator {
    /// Create a comparator reading `chunk_size` bytes per step (at least one).
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Determine whether `a` and `b` have byte-identical contents.
    ///
    /// Different extensions or different fingerprints answer `false` without
    /// touching the disk.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] if either file cannot be opened or read.
    pub fn compare(&self, a: &Media, b: &Media) -> Result<bool, CompareError> {
        if a.extension() != b.extension() {
            return Ok(false);
        }
        if a.fingerprint() != b.fingerprint() {
            return Ok(false);
        }
        if a.path() == b.path() {
            return Ok(true);
        }

        self.compare_files(a.path(), b.path())
            .map_err(|source| CompareError {
                left: a.path().to_path_buf(),
                right: b.path().to_path_buf(),
                source,
            })
    }

    fn compare_files(&self, left: &Path, right: &Path) -> io::Result<bool> {
        let mut left = File::open(left)?;
        let mut right = File::open(right)?;

        // Same-length check is only a shortcut; the streaming loop below
        // still catches files that change size mid-read.
        if left.metadata()?.len() != right.metadata()?.len() {
            return Ok(false);
        }

        let mut left_buf = vec![0u8; self.chunk_size];
        let mut right_buf = vec![0u8; self.chunk_size];

        loop {
            let left_len = read_chunk(&mut left, &mut left_buf)?;
            let right_len = read_chunk(&mut right, &mut right_buf)?;

            if left_len != right_len {
                // One stream hit end-of-file first.
                return Ok(false);
            }
            if left_len == 0 {
                return Ok(true);
            }
            if left_buf[..left_len] != right_buf[..right_len] {
                return Ok(false);
            }
        }
    }
}

/// Fill `buf` as far as possible; a short count means end-of-stream.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
