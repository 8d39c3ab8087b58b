//! npulet-allocator: Topology-aware device allocators for npulet
//!
//! This crate picks topology-optimal device subsets for resource requests:
//! - A hint matrix scoring physical proximity between device groups
//! - An exhaustive score-based optimal allocator
//! - A scalable heuristic bin-packing allocator

pub mod bin_packing;
pub mod hint;
pub mod mock;
pub mod optimal;

pub use bin_packing::BinPackingAllocator;
pub use hint::{score_device_set, FnHintProvider, HintProvider, TopologyHintMatrix};
pub use optimal::ScoreBasedOptimalAllocator;

use npulet_core::{Device, DeviceSet};

/// Picks a topology-optimal subset of `available` for a resource request.
///
/// `allocate` is a pure function over the caller's availability snapshot: it
/// keeps no ledger and does not serialize concurrent requests. Infeasibility
/// (`count` exceeds availability, `required` cannot be covered) is the
/// expected steady-state answer `None`, never an error or a panic. Callers
/// are responsible for `required ⊆ available`.
pub trait DeviceAllocator<D: Device> {
    fn allocate(
        &self,
        available: &DeviceSet<D>,
        required: &DeviceSet<D>,
        count: usize,
    ) -> Option<DeviceSet<D>>;
}
