//! Prefix fingerprinting with FNV-1a.
//!
//! # Overview
//! A fingerprint is a 32-bit FNV-1a digest of the first few bytes of a file.
//! It is only a bucketing key: files that share a fingerprint are always
//! re-checked byte for byte before being treated as duplicates, so prefix
//! collisions cost comparison work and nothing else.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::MediaError;

/// A 32-bit prefix fingerprint.
pub type Fingerprint = u32;

/// Number of leading bytes hashed by default.
pub const DEFAULT_PREFIX_SIZE: usize = 64;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Compute the FNV-1a 32-bit digest of a byte slice.
///
/// # Example
///
/// ```
/// use photo_organizer::scanner::fingerprint_bytes;
///
/// assert_eq!(fingerprint_bytes(b""), 0x811c_9dc5);
/// assert_eq!(fingerprint_bytes(b"a"), 0xe40c_292c);
/// ```
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Computes prefix fingerprints for files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinter {
    prefix_size: usize,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_SIZE)
    }
}

impl Fingerprinter {
    /// Create a fingerprinter that hashes the first `prefix_size` bytes.
    ///
    /// A zero prefix is bumped to one byte so that fingerprints still
    /// distinguish something.
    #[must_use]
    pub fn new(prefix_size: usize) -> Self {
        Self {
            prefix_size: prefix_size.max(1),
        }
    }

    /// Number of leading bytes hashed.
    #[must_use]
    pub fn prefix_size(&self) -> usize {
        self.prefix_size
    }

    /// Fingerprint the file at `path`.
    ///
    /// Files shorter than the prefix are hashed over the bytes they have;
    /// reaching end-of-stream early is not an error. The file handle is
    /// closed before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Open`] if the file cannot be opened and
    /// [`MediaError::Read`] if reading fails before end-of-stream.
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, MediaError> {
        let file = File::open(path).map_err(|source| MediaError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut prefix = Vec::with_capacity(self.prefix_size);
        file.take(self.prefix_size as u64)
            .read_to_end(&mut prefix)
            .map_err(|source| MediaError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(fingerprint_bytes(&prefix))
    }
}
