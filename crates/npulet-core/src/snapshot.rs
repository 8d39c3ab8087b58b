//! Declarative node snapshots
//!
//! A snapshot describes the devices present on a node and the pairwise link
//! categories between their hint keys, standing in for live hardware
//! introspection. The CLI and tests load snapshots from TOML or JSON files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{NodeConfig, ResourceStrategy};
use crate::device::{ExclusiveDevice, NpuDevice};
use crate::error::{NpuletError, NpuletResult};
use crate::topology::{LinkCategory, StaticLinkClassifier};

/// A node's device universe plus its topology relationships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub devices: Vec<SnapshotDevice>,
    #[serde(default)]
    pub links: Vec<SnapshotLink>,
}

/// One physical device in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDevice {
    pub uuid: String,
    pub index: u32,
    pub pci_bus_id: String,
    #[serde(default = "default_numa_node")]
    pub numa_node: i32,
    #[serde(default = "default_core_count")]
    pub core_count: u32,
}

fn default_numa_node() -> i32 {
    -1
}

fn default_core_count() -> u32 {
    8
}

/// Declared link category between two hint keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLink {
    pub a: String,
    pub b: String,
    pub category: LinkCategory,
}

impl NodeSnapshot {
    /// Load a snapshot from a TOML or JSON file, chosen by extension.
    pub fn from_file(path: &Path) -> NpuletResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NpuletError::Snapshot(format!("Failed to read snapshot file: {}", e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| NpuletError::Snapshot(format!("Failed to parse snapshot: {}", e))),
            _ => toml::from_str(&content)
                .map_err(|e| NpuletError::Snapshot(format!("Failed to parse snapshot: {}", e))),
        }
    }

    /// Expand the snapshot into allocatable units under `config`: blocked
    /// devices are dropped, the rest are exposed whole or split into
    /// partitions per the resource strategy.
    pub fn allocatable_devices(&self, config: &NodeConfig) -> NpuletResult<Vec<NpuDevice>> {
        let mut units = Vec::new();

        for device in &self.devices {
            if config.blocked_devices.contains(&device.uuid) {
                continue;
            }

            let origin = ExclusiveDevice::new(
                device.uuid.clone(),
                device.index,
                device.pci_bus_id.clone(),
                device.numa_node,
                device.core_count,
            );

            match config.resource_strategy {
                ResourceStrategy::Exclusive => units.push(NpuDevice::Exclusive(origin)),
                ResourceStrategy::Partitioned {
                    cores_per_partition,
                } => units.extend(origin.into_partitions(cores_per_partition)?),
            }
        }

        Ok(units)
    }

    /// Build the topology oracle declared by this snapshot.
    pub fn link_classifier(&self) -> StaticLinkClassifier {
        let mut classifier = StaticLinkClassifier::new();
        for link in &self.links {
            classifier.insert(link.a.as_str(), link.b.as_str(), link.category);
        }
        classifier
    }
}
