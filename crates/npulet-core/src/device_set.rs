//! Deduplicated device collections and their set algebra

use std::collections::{HashMap, HashSet};

use crate::device::Device;

/// A collection of devices deduplicated by ID.
///
/// Invariant: no two elements share an ID. Construction and `push` keep the
/// first-seen instance on duplicate IDs, which also absorbs malformed caller
/// input such as a duplicated device in an availability list.
#[derive(Debug, Clone)]
pub struct DeviceSet<D: Device> {
    devices: Vec<D>,
}

impl<D: Device> DeviceSet<D> {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            devices: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, D> {
        self.devices.iter()
    }

    pub fn devices(&self) -> &[D] {
        &self.devices
    }

    pub fn into_vec(self) -> Vec<D> {
        self.devices
    }

    /// Adds `device` unless a device with the same ID is already present.
    pub fn push(&mut self, device: D) {
        if !self.contains_id(device.id()) {
            self.devices.push(device);
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d.id() == id)
    }

    /// Whether every device ID in `target` appears in this set.
    ///
    /// An empty receiver or an empty target yields `false`: callers use this
    /// to distinguish "nothing allocated yet", so the vacuous case must not
    /// read as containment.
    pub fn contains_set(&self, target: &DeviceSet<D>) -> bool {
        if self.is_empty() || target.is_empty() {
            return false;
        }

        let visited: HashSet<&str> = self.devices.iter().map(|d| d.id()).collect();
        target.iter().all(|d| visited.contains(d.id()))
    }

    /// Order-independent equality over (ID, hint key) pairs.
    pub fn set_eq(&self, target: &DeviceSet<D>) -> bool {
        if self.len() != target.len() {
            return false;
        }

        let visited: HashMap<&str, &str> = self
            .devices
            .iter()
            .map(|d| (d.id(), d.hint_key().as_str()))
            .collect();

        target
            .iter()
            .all(|d| visited.get(d.id()) == Some(&d.hint_key().as_str()))
    }

    /// The subset of this set with no counterpart (by ID) in `target`.
    pub fn difference(&self, target: &DeviceSet<D>) -> DeviceSet<D> {
        let excluded: HashSet<&str> = target.iter().map(|d| d.id()).collect();

        self.devices
            .iter()
            .filter(|d| !excluded.contains(d.id()))
            .cloned()
            .collect()
    }

    /// All devices of both sets; on duplicate IDs the instance from `self`
    /// wins.
    pub fn union(&self, target: &DeviceSet<D>) -> DeviceSet<D> {
        self.devices.iter().chain(target.iter()).cloned().collect()
    }

    /// Sorts in place, ascending by device ID. Enumeration and tie-breaking
    /// downstream rely on this ordering being stable.
    pub fn sort(&mut self) {
        self.devices.sort_by(|a, b| a.id().cmp(b.id()));
    }
}

impl<D: Device> Default for DeviceSet<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> FromIterator<D> for DeviceSet<D> {
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        let mut set = DeviceSet::new();
        for device in iter {
            set.push(device);
        }
        set
    }
}

impl<D: Device> From<Vec<D>> for DeviceSet<D> {
    fn from(devices: Vec<D>) -> Self {
        devices.into_iter().collect()
    }
}

impl<D: Device> IntoIterator for DeviceSet<D> {
    type Item = D;
    type IntoIter = std::vec::IntoIter<D>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

impl<'a, D: Device> IntoIterator for &'a DeviceSet<D> {
    type Item = &'a D;
    type IntoIter = std::slice::Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
