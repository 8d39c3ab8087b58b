//! Core-range partitions of a physical device

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between a device UUID and its partition range in unit IDs.
pub const DEVICE_ID_DELIMITER: &str = "_cores_";

/// A contiguous range of compute-core indices on one physical device.
///
/// A partition covering cores 0 through 3 has `start == 0` and `end == 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub start: u32,
    pub end: u32,
}

impl Partition {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn core_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Node-wide index of a partition: partitions of board 0 come first, then
/// board 1, and so on, each board contributing `partition_count` slots.
pub fn partitioned_index(origin_index: u32, partition_index: u32, partition_count: u32) -> u32 {
    origin_index * partition_count + partition_index
}
