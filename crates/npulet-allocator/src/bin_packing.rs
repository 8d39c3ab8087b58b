//! Heuristic bin-packing allocation

use std::collections::BTreeMap;

use tracing::debug;

use npulet_core::{Device, DeviceSet, LinkClassifier, NpuletResult, TopologyHintKey};

use crate::hint::{score_device_set, HintProvider, TopologyHintMatrix};
use crate::DeviceAllocator;

/// Scalable heuristic allocator: buckets devices into co-located bins by
/// hint key and greedily fills the most topologically economical bins.
///
/// Trades the optimal allocator's exactness for linear-ish cost in the
/// device count. Every choice is deterministic: bins live in an ordered map
/// and score ties break by larger remaining bin, then by smaller key, never
/// by incidental iteration order.
pub struct BinPackingAllocator<P: HintProvider> {
    provider: P,
}

impl<P: HintProvider> BinPackingAllocator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Selects up to `max_select` new devices from `bins`, draining the
    /// chosen bin before moving to the next-best one. Returns only the newly
    /// selected devices; `already_allocated` only steers scoring.
    fn select_best_scored_devices<D: Device>(
        &self,
        max_select: usize,
        already_allocated: &DeviceSet<D>,
        bins: &mut BTreeMap<TopologyHintKey, DeviceSet<D>>,
    ) -> DeviceSet<D> {
        let mut selected = DeviceSet::new();

        while selected.len() < max_select && !bins.is_empty() {
            let context = already_allocated.union(&selected);
            let needed = max_select - selected.len();

            let Some(key) = self.pick_bin(needed, &context, bins) else {
                break;
            };

            let Some(bin) = bins.remove(&key) else {
                break;
            };

            let mut devices = bin.into_vec();
            let rest = devices.split_off(needed.min(devices.len()));
            if !rest.is_empty() {
                bins.insert(key, rest.into());
            }

            selected = selected.union(&devices.into());
        }

        selected
    }

    /// Picks the bin whose prefix, joined with `context`, scores highest.
    ///
    /// Same-key affinity is maximal, so a bin already represented in
    /// `context` outranks unrepresented ones; with an empty context the
    /// largest bin wins (more intra-bin pairs, and the explicit size
    /// tie-break covers affinity-free matrices). Remaining ties go to the
    /// lexicographically smallest key.
    fn pick_bin<D: Device>(
        &self,
        needed: usize,
        context: &DeviceSet<D>,
        bins: &BTreeMap<TopologyHintKey, DeviceSet<D>>,
    ) -> Option<TopologyHintKey> {
        let mut best: Option<(TopologyHintKey, u32, usize)> = None;

        for (key, bin) in bins {
            let prefix: DeviceSet<D> = bin.devices()[..needed.min(bin.len())]
                .iter()
                .cloned()
                .collect();
            let score = score_device_set(&self.provider, prefix.union(context).devices());

            let better = match &best {
                None => true,
                Some((_, best_score, best_len)) => {
                    score > *best_score || (score == *best_score && bin.len() > *best_len)
                }
            };

            if better {
                best = Some((key.clone(), score, bin.len()));
            }
        }

        best.map(|(key, _, _)| key)
    }
}

impl BinPackingAllocator<TopologyHintMatrix> {
    /// Build the hint matrix for the device universe once; `allocate` reuses
    /// it for every request against this topology snapshot.
    pub fn from_devices<D: Device>(
        devices: &[D],
        classifier: &impl LinkClassifier,
    ) -> NpuletResult<Self> {
        Ok(Self::new(TopologyHintMatrix::from_devices(
            devices, classifier,
        )?))
    }
}

impl<P: HintProvider, D: Device> DeviceAllocator<D> for BinPackingAllocator<P> {
    fn allocate(
        &self,
        available: &DeviceSet<D>,
        required: &DeviceSet<D>,
        count: usize,
    ) -> Option<DeviceSet<D>> {
        if count > available.len() {
            return None;
        }

        let mut remaining = count.checked_sub(required.len())?;
        if remaining == 0 {
            return Some(required.clone());
        }

        let mut bins: BTreeMap<TopologyHintKey, DeviceSet<D>> = BTreeMap::new();
        for device in available.difference(required) {
            bins.entry(device.hint_key().clone())
                .or_default()
                .push(device);
        }

        let mut finalized = required.clone();
        while remaining > 0 {
            let selected = self.select_best_scored_devices(remaining, &finalized, &mut bins);
            if selected.is_empty() {
                break;
            }

            remaining -= selected.len();
            finalized = finalized.union(&selected);
        }

        // Fail closed: a partial fill or a dropped required device is not a
        // usable allocation.
        if finalized.len() != count {
            return None;
        }
        if !required.is_empty() && !finalized.contains_set(required) {
            return None;
        }

        debug!(
            requested = count,
            bins_left = bins.len(),
            devices = ?finalized.iter().map(|d| d.id()).collect::<Vec<_>>(),
            "Bin-packing allocation selected"
        );

        Some(finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        mock_device, mock_device_set, same_board_device_set, two_board_partition_matrix,
        two_socket_balanced_matrix, MockDevice,
    };

    fn boards(sizes: &[(&str, usize)]) -> DeviceSet<MockDevice> {
        let mut all = DeviceSet::new();
        for (key, size) in sizes {
            all = all.union(&same_board_device_set(*size, key));
        }
        all
    }

    fn hint_keys(set: &DeviceSet<MockDevice>) -> Vec<&str> {
        set.iter().map(|d| d.hint_key().as_str()).collect()
    }

    #[test]
    fn test_allocating_everything_returns_everything() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let available = boards(&[("0", 4), ("1", 4)]);

        let result = allocator
            .allocate(&available, &DeviceSet::new(), 8)
            .unwrap();
        assert!(result.set_eq(&available));
    }

    #[test]
    fn test_full_group_is_preferred_over_split() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let available = boards(&[("0", 4), ("1", 4)]);

        let result = allocator
            .allocate(&available, &DeviceSet::new(), 4)
            .unwrap();
        let keys = hint_keys(&result);
        assert!(keys.iter().all(|k| *k == keys[0]));
    }

    #[test]
    fn test_required_seed_keeps_filling_its_board() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let board0 = same_board_device_set(4, "0");
        let board1 = same_board_device_set(4, "1");
        let available = board0.union(&board1);

        let seed: DeviceSet<MockDevice> = vec![board1.devices()[0].clone()].into();
        let result = allocator.allocate(&available, &seed, 4).unwrap();

        assert!(result.contains_set(&seed));
        assert!(result.set_eq(&board1));
    }

    #[test]
    fn test_largest_bin_opens_first() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let big = same_board_device_set(4, "1");
        let small = same_board_device_set(2, "0");
        let available = small.union(&big);

        let result = allocator
            .allocate(&available, &DeviceSet::new(), 3)
            .unwrap();
        assert!(hint_keys(&result).iter().all(|k| *k == "1"));
    }

    #[test]
    fn test_largest_bin_wins_even_without_affinity() {
        // Empty matrix: every score is zero, so bin size and key order carry
        // the decision alone.
        let allocator = BinPackingAllocator::new(TopologyHintMatrix::new());
        let available = boards(&[("0", 2), ("1", 5), ("2", 3)]);

        let result = allocator
            .allocate(&available, &DeviceSet::new(), 4)
            .unwrap();
        assert!(hint_keys(&result).iter().all(|k| *k == "1"));
    }

    #[test]
    fn test_exhausted_bin_is_skipped() {
        // Two boards of 8; 9 devices already allocated, exhausting board "0"
        // and taking one from board "1". The 7 remaining requested devices
        // must all come from board "1" rather than opening a third source.
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let board0 = same_board_device_set(8, "0");
        let board1 = same_board_device_set(8, "1");
        let available = board0.union(&board1);

        let first_of_board1: DeviceSet<MockDevice> = vec![board1.devices()[0].clone()].into();
        let seed = board0.union(&first_of_board1);
        assert_eq!(seed.len(), 9);

        let result = allocator.allocate(&available, &seed, 16).unwrap();
        assert!(result.set_eq(&available));

        let newly = result.difference(&seed);
        assert_eq!(newly.len(), 7);
        assert!(hint_keys(&newly).iter().all(|k| *k == "1"));
    }

    #[test]
    fn test_spillover_after_draining_best_bin() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let available = boards(&[("0", 4), ("1", 4)]);

        let result = allocator
            .allocate(&available, &DeviceSet::new(), 6)
            .unwrap();
        assert_eq!(result.len(), 6);

        // One board fully drained, two drawn from the other.
        let keys = hint_keys(&result);
        let on_zero = keys.iter().filter(|k| **k == "0").count();
        assert!(on_zero == 2 || on_zero == 4);
    }

    #[test]
    fn test_count_exceeding_available_is_infeasible() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let available = boards(&[("0", 4)]);
        assert!(allocator
            .allocate(&available, &DeviceSet::new(), 5)
            .is_none());
    }

    #[test]
    fn test_required_larger_than_count_is_infeasible() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let available = boards(&[("0", 4)]);
        let required: DeviceSet<MockDevice> = available.iter().take(3).cloned().collect();
        assert!(allocator.allocate(&available, &required, 2).is_none());
    }

    #[test]
    fn test_count_equal_to_required_returns_required() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let available = boards(&[("0", 4)]);
        let required: DeviceSet<MockDevice> = available.iter().take(2).cloned().collect();

        let result = allocator.allocate(&available, &required, 2).unwrap();
        assert!(result.set_eq(&required));
    }

    #[test]
    fn test_result_always_contains_required() {
        let allocator = BinPackingAllocator::new(two_socket_balanced_matrix());
        let available = mock_device_set(0..=7);

        for n in 0..8u32 {
            let required: DeviceSet<MockDevice> = vec![mock_device(n)].into();
            let result = allocator.allocate(&available, &required, 4).unwrap();
            assert!(result.contains_set(&required), "device {} missing", n);
            assert_eq!(result.len(), 4);
        }
    }

    #[test]
    fn test_single_device_bins_follow_socket_affinity() {
        // Keys "0".."7", one device per key. Starting from a required device
        // on socket 1, the heuristic keeps drawing socket-1 neighbours.
        let allocator = BinPackingAllocator::new(two_socket_balanced_matrix());
        let available = mock_device_set(0..=7);
        let required: DeviceSet<MockDevice> = vec![mock_device(4)].into();

        let result = allocator.allocate(&available, &required, 4).unwrap();
        assert!(result.set_eq(&mock_device_set(4..=7)));
    }

    #[test]
    fn test_deterministic_across_repeats() {
        let allocator = BinPackingAllocator::new(two_board_partition_matrix());
        let available = boards(&[("0", 3), ("1", 3), ("2", 3)]);

        let first = allocator
            .allocate(&available, &DeviceSet::new(), 5)
            .unwrap();
        for _ in 0..10 {
            let again = allocator
                .allocate(&available, &DeviceSet::new(), 5)
                .unwrap();
            assert!(first.set_eq(&again));
        }
    }
}
