//! Destination path planning.
//!
//! A unique file lands at `<dest>/<year>/<month>/<fingerprint><ext>`, with
//! the month unpadded and the fingerprint in decimal. Files without a date go
//! under `<dest>/unknown/`. Two representatives can share a fingerprint (a
//! collision) and therefore a base name; later ones get `-1`, `-2`, ...

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::date::CaptureDate;
use crate::duplicates::Media;

/// Directory used for files without a resolvable date.
pub const UNKNOWN_DIR: &str = "unknown";

/// One planned copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCopy {
    /// Representative to copy
    pub source: PathBuf,
    /// Where it goes
    pub destination: PathBuf,
    /// Date used to choose the directory
    pub date: CaptureDate,
}

/// Assigns collision-free destination paths.
#[derive(Debug)]
pub struct PathPlanner {
    root: PathBuf,
    taken: HashSet<PathBuf>,
    avoid_existing: bool,
}

impl PathPlanner {
    /// Plan paths beneath `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            taken: HashSet::new(),
            avoid_existing: false,
        }
    }

    /// Also treat paths already present on disk as taken.
    ///
    /// Used when the destination is not cleared before a run.
    #[must_use]
    pub fn with_avoid_existing(mut self, avoid: bool) -> Self {
        self.avoid_existing = avoid;
        self
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.taken.contains(path) || (self.avoid_existing && path.exists())
    }

    /// Destination root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a given date.
    #[must_use]
    pub fn directory_for(&self, date: CaptureDate) -> PathBuf {
        match date.year_month() {
            Some((year, month)) => self.root.join(year.to_string()).join(month.to_string()),
            None => self.root.join(UNKNOWN_DIR),
        }
    }

    /// Plan a destination for `media`, unique among everything planned so far.
    pub fn plan(&mut self, media: &Media, date: CaptureDate) -> PlannedCopy {
        let dir = self.directory_for(date);
        let stem = media.fingerprint().to_string();
        let ext = media.extension();

        let file_name = |base: String| {
            let mut name = OsString::from(base);
            name.push(ext);
            name
        };

        let mut destination = dir.join(file_name(stem.clone()));
        let mut suffix = 0usize;
        while self.is_taken(&destination) {
            suffix += 1;
            destination = dir.join(file_name(format!("{}-{}", stem, suffix)));
        }
        if suffix > 0 {
            log::debug!(
                "Fingerprint collision for {}, using {}",
                media.path().display(),
                destination.display()
            );
        }

        self.taken.insert(destination.clone());
        PlannedCopy {
            source: media.path().to_path_buf(),
            destination,
            date,
        }
    }

    /// Number of paths planned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.taken.len()
    }

    /// Whether nothing has been planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}
