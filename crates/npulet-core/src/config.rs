//! Node configuration types

use serde::{Deserialize, Serialize};

use crate::error::{NpuletError, NpuletResult};

/// Node-level configuration for device exposure and allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// How physical devices are cut into allocatable units.
    pub resource_strategy: ResourceStrategy,
    /// Which allocator answers resource requests.
    pub allocation_policy: AllocationPolicy,
    /// Device UUIDs excluded from the allocatable universe.
    #[serde(default)]
    pub blocked_devices: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            resource_strategy: ResourceStrategy::Exclusive,
            allocation_policy: AllocationPolicy::Optimal,
            blocked_devices: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> NpuletResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NpuletError::Config(format!("Failed to read config file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| NpuletError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Strategy cutting physical devices into allocatable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ResourceStrategy {
    /// One allocatable unit per physical device.
    Exclusive,
    /// Each physical device is split into fixed-size core-range partitions.
    Partitioned { cores_per_partition: u32 },
}

/// Allocator selection.
///
/// The optimal allocator is exhaustive and combinatorial in the request
/// size; large device counts belong on the bin-packing allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationPolicy {
    Optimal,
    BinPacking,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.resource_strategy, ResourceStrategy::Exclusive);
        assert_eq!(config.allocation_policy, AllocationPolicy::Optimal);
        assert!(config.blocked_devices.is_empty());
    }

    #[test]
    fn test_parse_partitioned_config() {
        let toml = r#"
            allocation_policy = "bin-packing"
            blocked_devices = ["a3e78042-9cc7-4344-9541-d2d3ffd28106"]

            [resource_strategy]
            mode = "partitioned"
            cores_per_partition = 2
        "#;

        let config: NodeConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.resource_strategy,
            ResourceStrategy::Partitioned {
                cores_per_partition: 2
            }
        );
        assert_eq!(config.allocation_policy, AllocationPolicy::BinPacking);
        assert_eq!(config.blocked_devices.len(), 1);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = NodeConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.allocation_policy, config.allocation_policy);
    }
}
