//! Device abstraction shared by discovery and allocation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NpuletError, NpuletResult};
use crate::partition::{partitioned_index, Partition, DEVICE_ID_DELIMITER};

/// Opaque grouping key for devices considered physically co-located.
///
/// Typically a PCI bus ID. Partitions carved out of one board share the
/// parent board's key, so they keep scoring as same-location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopologyHintKey(String);

impl TopologyHintKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopologyHintKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for TopologyHintKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for TopologyHintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A device handle the allocator can reason about.
///
/// Devices are produced by discovery/partitioning and treated as read-only
/// values for the duration of one allocation decision.
pub trait Device: Clone {
    /// Stable unique ID identifying the device.
    fn id(&self) -> &str;

    /// Grouping key used to look up topology hints for this device.
    fn hint_key(&self) -> &TopologyHintKey;

    /// Whether this handle refers to the same allocatable unit as `other`.
    fn same_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// An allocatable NPU unit.
///
/// The set of device shapes is closed: a device is either handed out whole
/// or as one partition of a board. There is no open-ended device hierarchy
/// behind this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpuDevice {
    /// A whole physical device, allocated exclusively.
    Exclusive(ExclusiveDevice),
    /// A core-range slice of a physical device.
    Partitioned(PartitionedDevice),
}

impl NpuDevice {
    /// Device index as exposed to the container runtime.
    pub fn index(&self) -> u32 {
        match self {
            NpuDevice::Exclusive(dev) => dev.index,
            NpuDevice::Partitioned(dev) => dev.index,
        }
    }

    /// UUID of the underlying physical device.
    pub fn uuid(&self) -> &str {
        match self {
            NpuDevice::Exclusive(dev) => &dev.uuid,
            NpuDevice::Partitioned(dev) => &dev.uuid,
        }
    }

    /// NUMA node the underlying physical device is attached to.
    pub fn numa_node(&self) -> i32 {
        match self {
            NpuDevice::Exclusive(dev) => dev.numa_node,
            NpuDevice::Partitioned(dev) => dev.numa_node,
        }
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, NpuDevice::Exclusive(_))
    }
}

impl Device for NpuDevice {
    fn id(&self) -> &str {
        match self {
            NpuDevice::Exclusive(dev) => &dev.uuid,
            NpuDevice::Partitioned(dev) => &dev.device_id,
        }
    }

    fn hint_key(&self) -> &TopologyHintKey {
        match self {
            NpuDevice::Exclusive(dev) => &dev.pci_bus_id,
            NpuDevice::Partitioned(dev) => &dev.pci_bus_id,
        }
    }
}

/// A whole physical device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusiveDevice {
    /// Stable device UUID; doubles as the allocatable unit's ID.
    pub uuid: String,
    /// Index of the physical device on the node.
    pub index: u32,
    /// PCI bus ID, used as the topology hint key.
    pub pci_bus_id: TopologyHintKey,
    /// NUMA node, -1 if unknown.
    pub numa_node: i32,
    /// Number of compute cores on the device.
    pub core_count: u32,
}

impl ExclusiveDevice {
    pub fn new(
        uuid: impl Into<String>,
        index: u32,
        pci_bus_id: impl Into<TopologyHintKey>,
        numa_node: i32,
        core_count: u32,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            index,
            pci_bus_id: pci_bus_id.into(),
            numa_node,
            core_count,
        }
    }

    /// Split this device into per-partition units of `cores_per_partition`
    /// cores each. The partitions inherit the parent's hint key.
    ///
    /// Fails when `cores_per_partition` is zero or does not divide the
    /// device's core count evenly.
    pub fn into_partitions(self, cores_per_partition: u32) -> NpuletResult<Vec<NpuDevice>> {
        if cores_per_partition == 0 || self.core_count % cores_per_partition != 0 {
            return Err(NpuletError::Device(format!(
                "cannot split {} cores of device {} into partitions of {}",
                self.core_count, self.uuid, cores_per_partition
            )));
        }

        let partition_count = self.core_count / cores_per_partition;
        let partitions = (0..partition_count)
            .map(|partition_idx| {
                let partition = Partition::new(
                    partition_idx * cores_per_partition,
                    (partition_idx + 1) * cores_per_partition - 1,
                );

                NpuDevice::Partitioned(PartitionedDevice::new(
                    self.uuid.clone(),
                    partitioned_index(self.index, partition_idx, partition_count),
                    partition,
                    self.pci_bus_id.clone(),
                    self.numa_node,
                ))
            })
            .collect();

        Ok(partitions)
    }
}

/// A core-range slice of a physical device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionedDevice {
    /// Precomputed unit ID: `<uuid>_cores_<range>`.
    device_id: String,
    /// UUID of the parent physical device.
    pub uuid: String,
    /// Index of this partition across all partitions on the node.
    pub index: u32,
    /// Core range this partition covers.
    pub partition: Partition,
    /// PCI bus ID of the parent device; partitions inherit it unchanged.
    pub pci_bus_id: TopologyHintKey,
    /// NUMA node of the parent device.
    pub numa_node: i32,
}

impl PartitionedDevice {
    pub fn new(
        uuid: impl Into<String>,
        index: u32,
        partition: Partition,
        pci_bus_id: impl Into<TopologyHintKey>,
        numa_node: i32,
    ) -> Self {
        let uuid = uuid.into();
        // e.g. UUID a3e78042-9cc7-4344-9541-d2d3ffd28106 with cores 0-1 yields
        // "a3e78042-9cc7-4344-9541-d2d3ffd28106_cores_0-1".
        let device_id = format!("{}{}{}", uuid, DEVICE_ID_DELIMITER, partition);

        Self {
            device_id,
            uuid,
            index,
            partition,
            pci_bus_id: pci_bus_id.into(),
            numa_node,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> ExclusiveDevice {
        ExclusiveDevice::new("a3e78042-9cc7-4344-9541-d2d3ffd28106", 1, "27", 0, 8)
    }

    #[test]
    fn test_exclusive_device_identity() {
        let dev = NpuDevice::Exclusive(board());
        assert_eq!(dev.id(), "a3e78042-9cc7-4344-9541-d2d3ffd28106");
        assert_eq!(dev.hint_key().as_str(), "27");
        assert!(dev.is_exclusive());
    }

    #[test]
    fn test_partitioned_device_ids() {
        let partitions = board().into_partitions(2).unwrap();
        assert_eq!(partitions.len(), 4);

        assert_eq!(
            partitions[0].id(),
            "a3e78042-9cc7-4344-9541-d2d3ffd28106_cores_0-1"
        );
        assert_eq!(
            partitions[3].id(),
            "a3e78042-9cc7-4344-9541-d2d3ffd28106_cores_6-7"
        );
    }

    #[test]
    fn test_partitions_inherit_hint_key() {
        for partition in board().into_partitions(4).unwrap() {
            assert_eq!(partition.hint_key().as_str(), "27");
            assert!(!partition.is_exclusive());
        }
    }

    #[test]
    fn test_partition_index_derivation() {
        // Board index 1 split four ways occupies indices 4..8.
        let indices: Vec<u32> = board()
            .into_partitions(2)
            .unwrap()
            .iter()
            .map(|d| d.index())
            .collect();
        assert_eq!(indices, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_uneven_partitioning_rejected() {
        assert!(board().into_partitions(3).is_err());
        assert!(board().into_partitions(0).is_err());
    }

    #[test]
    fn test_same_as_compares_ids() {
        let a = NpuDevice::Exclusive(board());
        let b = NpuDevice::Exclusive(ExclusiveDevice::new(
            "a3e78042-9cc7-4344-9541-d2d3ffd28106",
            3,
            "99",
            1,
            8,
        ));
        assert!(a.same_as(&b));
    }
}
