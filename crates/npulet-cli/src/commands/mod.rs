//! CLI commands implementation

use std::path::Path;

use anyhow::{bail, Result};

use npulet_allocator::{
    score_device_set, BinPackingAllocator, DeviceAllocator, ScoreBasedOptimalAllocator,
    TopologyHintMatrix,
};
use npulet_core::{AllocationPolicy, Device, DeviceSet, NodeConfig, NodeSnapshot, NpuDevice};

/// List the allocatable units a snapshot expands to under the config.
pub fn devices(config: &NodeConfig, snapshot_path: &Path) -> Result<()> {
    let snapshot = NodeSnapshot::from_file(snapshot_path)?;
    let devices = snapshot.allocatable_devices(config)?;

    println!("{:<45} {:>5}  {:<8} {:>4}  SHAPE", "ID", "INDEX", "HINTKEY", "NUMA");
    for device in &devices {
        let shape = if device.is_exclusive() {
            "exclusive"
        } else {
            "partition"
        };
        println!(
            "{:<45} {:>5}  {:<8} {:>4}  {}",
            device.id(),
            device.index(),
            device.hint_key(),
            device.numa_node(),
            shape
        );
    }
    println!("{} allocatable device(s)", devices.len());

    Ok(())
}

/// Print the hint matrix a snapshot's topology declarations produce.
pub fn topology(config: &NodeConfig, snapshot_path: &Path) -> Result<()> {
    let snapshot = NodeSnapshot::from_file(snapshot_path)?;
    let devices = snapshot.allocatable_devices(config)?;
    let classifier = snapshot.link_classifier();

    let matrix = TopologyHintMatrix::from_devices(&devices, &classifier)?;
    if matrix.is_empty() {
        println!("No topology entries (empty snapshot)");
        return Ok(());
    }

    println!("{:<8} {:<8} SCORE", "KEY", "KEY");
    for (a, b, score) in matrix.entries() {
        println!("{:<8} {:<8} {}", a, b, score);
    }

    Ok(())
}

/// Run one allocation request against a snapshot and report the outcome.
pub fn allocate(
    config: &NodeConfig,
    snapshot_path: &Path,
    count: usize,
    required_ids: &[String],
    policy: AllocationPolicy,
) -> Result<()> {
    let snapshot = NodeSnapshot::from_file(snapshot_path)?;
    let devices = snapshot.allocatable_devices(config)?;
    let classifier = snapshot.link_classifier();
    let matrix = TopologyHintMatrix::from_devices(&devices, &classifier)?;

    let available: DeviceSet<NpuDevice> = devices.into_iter().collect();
    let mut required = DeviceSet::new();
    for id in required_ids {
        match available.iter().find(|d| d.id() == id) {
            Some(device) => required.push(device.clone()),
            None => bail!("required device '{}' is not in the snapshot", id),
        }
    }

    let result = match policy {
        AllocationPolicy::Optimal => {
            ScoreBasedOptimalAllocator::new(matrix.clone()).allocate(&available, &required, count)
        }
        AllocationPolicy::BinPacking => {
            BinPackingAllocator::new(matrix.clone()).allocate(&available, &required, count)
        }
    };

    match result {
        Some(allocated) => {
            println!(
                "Allocated {} device(s), total affinity score {}",
                allocated.len(),
                score_device_set(&matrix, allocated.devices())
            );
            for device in &allocated {
                println!("  {} (hint key {})", device.id(), device.hint_key());
            }
        }
        None => {
            println!(
                "Request infeasible: {} device(s) requested, {} available",
                count,
                available.len()
            );
        }
    }

    Ok(())
}
