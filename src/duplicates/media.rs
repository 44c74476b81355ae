//! The media value that flows through the dedup pipeline.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::{Fingerprint, Fingerprinter, MediaError};

/// A handle to one file under consideration.
///
/// A `Media` never holds an open file: handles are opened for the duration
/// of a fingerprint or a comparison and closed before those return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    path: PathBuf,
    fingerprint: Fingerprint,
    #[serde(skip)]
    extension: OsString,
}

impl Media {
    /// Fingerprint the file at `path` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns a [`MediaError`] if the file cannot be opened or read.
    pub fn open(path: PathBuf, fingerprinter: &Fingerprinter) -> Result<Self, MediaError> {
        let fingerprint = fingerprinter.fingerprint(&path)?;
        Ok(Self::with_fingerprint(path, fingerprint))
    }

    /// Build a `Media` from an already computed fingerprint.
    #[must_use]
    pub fn with_fingerprint(path: PathBuf, fingerprint: Fingerprint) -> Self {
        let extension = extension_of(&path);
        Self {
            path,
            fingerprint,
            extension,
        }
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prefix fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Extension including the leading dot, exactly as written in the path
    /// (`".JPG"` and `".jpg"` differ). Empty when the path has none.
    ///
    /// Kept as raw OS bytes so non-UTF-8 extensions never collapse together.
    #[must_use]
    pub fn extension(&self) -> &OsStr {
        &self.extension
    }

    /// Consume the value, returning its path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

fn extension_of(path: &Path) -> OsString {
    match path.extension() {
        Some(ext) => {
            let mut dotted = OsString::with_capacity(ext.len() + 1);
            dotted.push(".");
            dotted.push(ext);
            dotted
        }
        None => OsString::new(),
    }
}
