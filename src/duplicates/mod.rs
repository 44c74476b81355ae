//! Content deduplication.
//!
//! This module provides functionality for:
//! - The [`Media`] value and exact content comparison
//! - The fingerprint [`Registry`] of content-distinct representatives
//! - Partition workers and the sequential merge
//! - The [`DuplicateFinder`] engine tying them together

pub mod compare;
pub mod finder;
pub mod media;
pub mod merge;
pub mod partition;
pub mod registry;

pub use compare::{CompareError, ExactComparator};
pub use finder::{DedupReport, DedupSummary, DuplicateFinder, FinderConfig, FinderError};
pub use media::Media;
pub use merge::{merge_partitions, MergeCoordinator, MergeStats};
pub use partition::{run_partition, PartitionContext, PartitionResult, PartitionWorker, SkippedFile};
pub use registry::{AddOutcome, Registry, RegistryStats};
