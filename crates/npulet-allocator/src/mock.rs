//! Mock devices and fixtures for allocator tests

use std::ops::RangeInclusive;

use uuid::Uuid;

use npulet_core::{Device, DeviceSet, TopologyHintKey};

use crate::hint::TopologyHintMatrix;

/// Minimal device handle for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    id: String,
    hint_key: TopologyHintKey,
}

impl MockDevice {
    pub fn new(id: impl Into<String>, hint_key: impl Into<TopologyHintKey>) -> Self {
        Self {
            id: id.into(),
            hint_key: hint_key.into(),
        }
    }
}

impl Device for MockDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn hint_key(&self) -> &TopologyHintKey {
        &self.hint_key
    }
}

/// Device `n` with ID and hint key both `n`.
pub fn mock_device(n: u32) -> MockDevice {
    MockDevice::new(n.to_string(), n.to_string())
}

/// Devices `start..=end`, one hint key each.
pub fn mock_device_set(range: RangeInclusive<u32>) -> DeviceSet<MockDevice> {
    range.map(mock_device).collect()
}

/// `amount` devices on one board: distinct uuid-derived IDs, shared hint key.
pub fn same_board_device_set(amount: usize, hint_key: &str) -> DeviceSet<MockDevice> {
    let board = Uuid::new_v4();
    (0..amount)
        .map(|i| MockDevice::new(format!("{}_{:02}", board, i), hint_key))
        .collect()
}

/// Hint matrix for a two-socket node with four single-device boards per
/// socket (keys "0".."7"): 70 on-board, 30/20 within a socket, 10 across.
pub fn two_socket_balanced_matrix() -> TopologyHintMatrix {
    let mut matrix = TopologyHintMatrix::new();

    for socket in 0..2u32 {
        let base = socket * 4;
        for i in base..base + 4 {
            matrix.insert(i.to_string(), i.to_string(), 70);
        }

        matrix.insert(base.to_string(), (base + 1).to_string(), 30);
        matrix.insert((base + 2).to_string(), (base + 3).to_string(), 30);
        matrix.insert(base.to_string(), (base + 2).to_string(), 20);
        matrix.insert(base.to_string(), (base + 3).to_string(), 20);
        matrix.insert((base + 1).to_string(), (base + 2).to_string(), 20);
        matrix.insert((base + 1).to_string(), (base + 3).to_string(), 20);
    }

    for left in 0..4u32 {
        for right in 4..8u32 {
            matrix.insert(left.to_string(), right.to_string(), 10);
        }
    }

    matrix
}

/// Matrix for two boards of four co-resident partitions each (keys "0" and
/// "1"): 70 on-board, 10 across.
pub fn two_board_partition_matrix() -> TopologyHintMatrix {
    let mut matrix = TopologyHintMatrix::new();
    matrix.insert("0", "0", 70);
    matrix.insert("1", "1", 70);
    matrix.insert("0", "1", 10);
    matrix
}
