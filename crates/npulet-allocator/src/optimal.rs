//! Exhaustive score-based optimal allocation

use itertools::Itertools;
use tracing::debug;

use npulet_core::{Device, DeviceSet, LinkClassifier, NpuletResult};

use crate::hint::{score_device_set, HintProvider, TopologyHintMatrix};
use crate::DeviceAllocator;

/// Allocator that enumerates every feasible subset of the requested size and
/// returns the one with the highest total pairwise affinity.
///
/// Cost is O(C(n, count) · count²): intentionally exhaustive, correct for the
/// tens of devices a single node carries. It is the reference against which
/// the bin-packing heuristic is validated; route large requests to
/// [`crate::BinPackingAllocator`] instead. Subsets are produced one at a time
/// by a lazy index-combination iterator, so memory stays bounded in `count`.
pub struct ScoreBasedOptimalAllocator<P: HintProvider> {
    provider: P,
}

impl<P: HintProvider> ScoreBasedOptimalAllocator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl ScoreBasedOptimalAllocator<TopologyHintMatrix> {
    /// Build the hint matrix for `devices` through `classifier` and wrap it
    /// in an allocator. The matrix is built once and reused for every
    /// `allocate` call against this snapshot.
    pub fn from_devices<D: Device>(
        devices: &[D],
        classifier: &impl LinkClassifier,
    ) -> NpuletResult<Self> {
        Ok(Self::new(TopologyHintMatrix::from_devices(
            devices, classifier,
        )?))
    }
}

impl<P: HintProvider, D: Device> DeviceAllocator<D> for ScoreBasedOptimalAllocator<P> {
    /// Returns the highest-scoring size-`count` subset of `available` that
    /// contains every device of `required`, or `None` when no such subset
    /// exists.
    ///
    /// Ties between equal-scoring subsets go to the first one generated,
    /// which is the lexicographic combination order over the device list
    /// sorted by ID. The sort happens here, so the tie-break does not depend
    /// on the order the caller supplies `available` in.
    fn allocate(
        &self,
        available: &DeviceSet<D>,
        required: &DeviceSet<D>,
        count: usize,
    ) -> Option<DeviceSet<D>> {
        if count > available.len() {
            return None;
        }

        // A request fully pinned by `required` has nothing left to choose.
        let subset_len = count.checked_sub(required.len())?;
        if subset_len == 0 {
            return Some(required.clone());
        }

        let mut pool = available.difference(required);
        pool.sort();
        if subset_len > pool.len() {
            return None;
        }

        let pool = pool.devices();
        let mut best: Option<(DeviceSet<D>, u32)> = None;

        for indices in (0..pool.len()).combinations(subset_len) {
            let candidate: DeviceSet<D> = indices.into_iter().map(|i| pool[i].clone()).collect();
            let mut candidate = candidate.union(required);
            candidate.sort();

            let score = score_device_set(&self.provider, candidate.devices());
            match &best {
                Some((_, best_score)) if score <= *best_score => {}
                _ => best = Some((candidate, score)),
            }
        }

        let (chosen, score) = best?;
        debug!(
            requested = count,
            score,
            devices = ?chosen.iter().map(|d| d.id()).collect::<Vec<_>>(),
            "Optimal allocation selected"
        );

        Some(chosen)
    }
}
