//! The dedup registry.
//!
//! # Overview
//!
//! A [`Registry`] maps each fingerprint to the list of representatives seen
//! under it. Representatives in one bucket are pairwise content-distinct:
//! a fingerprint only identifies a prefix, so several different files may
//! legitimately share a bucket.
//!
//! Adding a candidate compares it against **every** representative in its
//! bucket. Comparing against only the most recent occupant would miss
//! duplicates of earlier occupants.
//!
//! # Example
//!
//! ```no_run
//! use photo_organizer::duplicates::{AddOutcome, Media, Registry};
//! use photo_organizer::scanner::Fingerprinter;
//! use std::path::PathBuf;
//!
//! let fingerprinter = Fingerprinter::default();
//! let mut registry = Registry::new();
//!
//! for name in ["a.jpg", "b.jpg"] {
//!     let media = Media::open(PathBuf::from(name), &fingerprinter).unwrap();
//!     match registry.add(media).unwrap() {
//!         AddOutcome::Added => println!("{name} is unique"),
//!         AddOutcome::Duplicate { existing } => {
//!             println!("{name} duplicates {}", existing.display())
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use super::compare::{CompareError, ExactComparator};
use super::Media;
use crate::scanner::Fingerprint;

/// Result of [`Registry::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The candidate was new content and is now a representative.
    Added,
    /// The candidate's content matched an existing representative; the
    /// registry is unchanged.
    Duplicate {
        /// Path of the representative that matched
        existing: PathBuf,
    },
}

impl AddOutcome {
    /// Whether the candidate was inserted.
    #[must_use]
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Counters maintained by a registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Candidates inserted as representatives
    pub added: usize,
    /// Candidates rejected as duplicates
    pub duplicates: usize,
    /// Exact comparisons that actually had to read both files
    pub comparisons: usize,
}

/// Fingerprint index of content-distinct representatives.
#[derive(Debug, Default)]
pub struct Registry {
    comparator: ExactComparator,
    /// Fingerprint to indices into `representatives`
    buckets: HashMap<Fingerprint, Vec<usize>>,
    /// Every representative, in insertion order
    representatives: Vec<Media>,
    stats: RegistryStats,
}

impl Registry {
    /// Create an empty registry with the default comparator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry using `comparator` for exact checks.
    #[must_use]
    pub fn with_comparator(comparator: ExactComparator) -> Self {
        Self {
            comparator,
            ..Self::default()
        }
    }

    /// Insert `candidate` unless its content is already represented.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError`] if a comparison fails. The registry is left
    /// exactly as it was before the call.
    pub fn add(&mut self, candidate: Media) -> Result<AddOutcome, CompareError> {
        let fingerprint = candidate.fingerprint();

        if let Some(bucket) = self.buckets.get(&fingerprint) {
            for &idx in bucket {
                let existing = &self.representatives[idx];
                let same = self.comparator.compare(&candidate, existing)?;
                if existing.extension() == candidate.extension() {
                    self.stats.comparisons += 1;
                }
                if same {
                    log::trace!(
                        "{} duplicates {}",
                        candidate.path().display(),
                        existing.path().display()
                    );
                    self.stats.duplicates += 1;
                    return Ok(AddOutcome::Duplicate {
                        existing: existing.path().to_path_buf(),
                    });
                }
            }
        }

        // Every comparison has succeeded; only now is the registry touched.
        let idx = self.representatives.len();
        self.representatives.push(candidate);
        self.buckets.entry(fingerprint).or_default().push(idx);
        self.stats.added += 1;
        Ok(AddOutcome::Added)
    }

    /// Number of representatives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    /// Whether the registry holds no representatives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Representatives in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Media> {
        self.representatives.iter()
    }

    /// Representatives sharing `fingerprint`, in insertion order.
    pub fn bucket(&self, fingerprint: Fingerprint) -> impl Iterator<Item = &Media> {
        self.buckets
            .get(&fingerprint)
            .into_iter()
            .flatten()
            .map(|&idx| &self.representatives[idx])
    }

    /// Number of distinct fingerprints.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// Consume the registry, returning its representatives in insertion order.
    #[must_use]
    pub fn into_representatives(self) -> Vec<Media> {
        self.representatives
    }
}
