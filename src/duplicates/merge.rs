//! Folding partition results into one global registry.
//!
//! The merge is strictly sequential: one registry, one mutator. Each
//! partition's representatives are re-added through [`Registry::add`], so the
//! global registry keeps the same invariant as the partitions and content
//! split across partitions collapses to a single representative.
//!
//! Unlike inside a worker, a comparison failure here is fatal: skipping it
//! would silently produce an incorrect unique set.

use super::compare::{CompareError, ExactComparator};
use super::partition::PartitionResult;
use super::registry::Registry;

/// Counters for a completed merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Partitions folded in
    pub partitions: usize,
    /// Representatives offered by all partitions
    pub offered: usize,
    /// Representatives dropped because another partition already had them
    pub cross_partition_duplicates: usize,
}

/// Single-threaded owner of the global registry.
#[derive(Debug, Default)]
pub struct MergeCoordinator {
    registry: Registry,
    stats: MergeStats,
}

impl MergeCoordinator {
    /// Start with a fresh, empty global registry.
    #[must_use]
    pub fn new(comparator: ExactComparator) -> Self {
        Self {
            registry: Registry::with_comparator(comparator),
            stats: MergeStats::default(),
        }
    }

    /// Fold one partition's representatives in, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompareError`] hit; the merge must then be abandoned.
    pub fn absorb(&mut self, result: PartitionResult) -> Result<(), CompareError> {
        let offered = result.representatives.len();
        let before = self.registry.len();

        for media in result.representatives {
            self.registry.add(media)?;
        }

        let kept = self.registry.len() - before;
        self.stats.partitions += 1;
        self.stats.offered += offered;
        self.stats.cross_partition_duplicates += offered - kept;

        log::debug!(
            "Merged partition {}: {} offered, {} kept",
            result.worker_id,
            offered,
            kept
        );
        Ok(())
    }

    /// Fold every result in the given order.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompareError`] hit.
    pub fn absorb_all<I>(&mut self, results: I) -> Result<(), CompareError>
    where
        I: IntoIterator<Item = PartitionResult>,
    {
        results.into_iter().try_for_each(|result| self.absorb(result))
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Finish the merge, handing over the read-only global registry.
    #[must_use]
    pub fn finish(self) -> (Registry, MergeStats) {
        (self.registry, self.stats)
    }
}

/// Merge `results` into a fresh registry in the order given.
///
/// # Errors
///
/// Returns the first [`CompareError`] hit.
pub fn merge_partitions<I>(
    results: I,
    comparator: ExactComparator,
) -> Result<(Registry, MergeStats), CompareError>
where
    I: IntoIterator<Item = PartitionResult>,
{
    let mut coordinator = MergeCoordinator::new(comparator);
    coordinator.absorb_all(results)?;
    Ok(coordinator.finish())
}
