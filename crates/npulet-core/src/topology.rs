//! Physical-proximity classification between devices

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::TopologyHintKey;
use crate::error::NpuletResult;

/// Ordinal classification of the physical link between two devices.
///
/// Discriminants double as affinity scores and are deliberately gapped so
/// intermediate categories can be added without renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkCategory {
    /// Relationship could not be classified.
    Unknown = 0,
    /// Devices reachable only over a cross-machine or cross-socket interconnect.
    Interconnect = 10,
    /// Devices attached under the same CPU, possibly via different switches.
    SameCpu = 20,
    /// Devices under the same PCI host bridge.
    SameHostBridge = 30,
    /// Same chip; also the score of a device paired with itself.
    SameChip = 70,
}

impl LinkCategory {
    /// Affinity score of this category; higher means closer.
    pub fn score(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkCategory::Unknown => write!(f, "unknown"),
            LinkCategory::Interconnect => write!(f, "interconnect"),
            LinkCategory::SameCpu => write!(f, "same-cpu"),
            LinkCategory::SameHostBridge => write!(f, "same-host-bridge"),
            LinkCategory::SameChip => write!(f, "same-chip"),
        }
    }
}

/// The topology oracle: classifies the physical link between two hint keys.
///
/// Native introspection libraries live behind this trait; the allocator core
/// itself carries no foreign-function dependency. Classification may be
/// I/O-bound, so callers classify once per topology snapshot and cache.
pub trait LinkClassifier {
    fn classify(&self, a: &TopologyHintKey, b: &TopologyHintKey) -> NpuletResult<LinkCategory>;
}

/// Table-driven classifier over a declared link list.
///
/// Used by tests and by node snapshot files standing in for real hardware
/// introspection. Identical keys classify as [`LinkCategory::SameChip`];
/// undeclared pairs degrade to [`LinkCategory::Unknown`] rather than failing,
/// since snapshot files are user-authored.
#[derive(Debug, Clone, Default)]
pub struct StaticLinkClassifier {
    links: BTreeMap<(TopologyHintKey, TopologyHintKey), LinkCategory>,
}

impl StaticLinkClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the link category for an unordered key pair.
    pub fn insert(
        &mut self,
        a: impl Into<TopologyHintKey>,
        b: impl Into<TopologyHintKey>,
        category: LinkCategory,
    ) {
        let (mut a, mut b) = (a.into(), b.into());
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        self.links.insert((a, b), category);
    }
}

impl LinkClassifier for StaticLinkClassifier {
    fn classify(&self, a: &TopologyHintKey, b: &TopologyHintKey) -> NpuletResult<LinkCategory> {
        if a == b {
            return Ok(LinkCategory::SameChip);
        }

        let (a, b) = if a > b { (b, a) } else { (a, b) };
        Ok(self
            .links
            .get(&(a.clone(), b.clone()))
            .copied()
            .unwrap_or(LinkCategory::Unknown))
    }
}
