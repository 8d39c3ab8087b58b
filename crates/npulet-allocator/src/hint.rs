//! Topology hint matrix and scoring

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use npulet_core::{Device, LinkCategory, LinkClassifier, NpuletResult, TopologyHintKey};

/// Maps a device pair to an affinity score.
///
/// Scoring policy is decoupled from the allocation algorithms through this
/// trait: the allocators only ever ask "how close are these two keys". A
/// score of 0 means "no known affinity" and is a legitimate steady state.
pub trait HintProvider {
    fn hint(&self, a: &TopologyHintKey, b: &TopologyHintKey) -> u32;
}

/// Adapter turning a plain scoring function into a [`HintProvider`].
///
/// Lets tests and callers with bespoke scoring policies plug in a closure
/// instead of building a matrix.
pub struct FnHintProvider<F>(pub F);

impl<F> HintProvider for FnHintProvider<F>
where
    F: Fn(&TopologyHintKey, &TopologyHintKey) -> u32,
{
    fn hint(&self, a: &TopologyHintKey, b: &TopologyHintKey) -> u32 {
        (self.0)(a, b)
    }
}

/// Symmetric affinity scores between hint keys.
///
/// Pairs are canonicalized by lexicographic key order before storage and
/// lookup, so the matrix holds each unordered pair once and stays
/// O(distinct keys²) regardless of how many devices share a key. Built once
/// per topology snapshot and immutable thereafter; a hot-plug event requires
/// a rebuild, not a patch.
#[derive(Debug, Clone, Default)]
pub struct TopologyHintMatrix {
    scores: BTreeMap<(TopologyHintKey, TopologyHintKey), u32>,
}

impl TopologyHintMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify every distinct-key pair of `devices` through `classifier`
    /// and record the resulting scores.
    ///
    /// Devices sharing a hint key collapse to one matrix entry, and a key
    /// paired with itself scores [`LinkCategory::SameChip`] without
    /// consulting the oracle. A classification failure aborts construction.
    pub fn from_devices<D: Device>(
        devices: &[D],
        classifier: &impl LinkClassifier,
    ) -> NpuletResult<Self> {
        let keys: Vec<&TopologyHintKey> = devices
            .iter()
            .map(|d| d.hint_key())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut matrix = Self::new();
        for (i, key1) in keys.iter().enumerate() {
            matrix.insert((*key1).clone(), (*key1).clone(), LinkCategory::SameChip.score());

            for key2 in &keys[i + 1..] {
                let category = classifier.classify(key1, key2)?;
                matrix.insert((*key1).clone(), (*key2).clone(), category.score());
            }
        }

        debug!(
            devices = devices.len(),
            keys = keys.len(),
            entries = matrix.scores.len(),
            "Built topology hint matrix"
        );

        Ok(matrix)
    }

    /// Records the score for an unordered key pair.
    pub fn insert(
        &mut self,
        a: impl Into<TopologyHintKey>,
        b: impl Into<TopologyHintKey>,
        score: u32,
    ) {
        let (mut a, mut b) = (a.into(), b.into());
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        self.scores.insert((a, b), score);
    }

    /// Score for an unordered key pair; 0 when the pair was never classified.
    pub fn score(&self, a: &TopologyHintKey, b: &TopologyHintKey) -> u32 {
        let (a, b) = if a > b { (b, a) } else { (a, b) };
        self.scores
            .get(&(a.clone(), b.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Stored entries in canonical order, for diagnostics.
    pub fn entries(&self) -> impl Iterator<Item = (&TopologyHintKey, &TopologyHintKey, u32)> {
        self.scores.iter().map(|((a, b), score)| (a, b, *score))
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl HintProvider for TopologyHintMatrix {
    fn hint(&self, a: &TopologyHintKey, b: &TopologyHintKey) -> u32 {
        self.score(a, b)
    }
}

/// Total affinity of a device set: the sum of the provider's score over all
/// unordered pairs within it.
pub fn score_device_set<D: Device, P: HintProvider>(provider: &P, devices: &[D]) -> u32 {
    let mut total = 0;
    for i in 0..devices.len() {
        for j in (i + 1)..devices.len() {
            total += provider.hint(devices[i].hint_key(), devices[j].hint_key());
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{mock_device_set, MockDevice};
    use npulet_core::{NpuletError, StaticLinkClassifier};

    #[test]
    fn test_lookup_is_order_independent() {
        let mut matrix = TopologyHintMatrix::new();
        matrix.insert("2a", "27", 30);

        let (a, b) = (TopologyHintKey::new("27"), TopologyHintKey::new("2a"));
        assert_eq!(matrix.score(&a, &b), 30);
        assert_eq!(matrix.score(&b, &a), 30);
    }

    #[test]
    fn test_missing_pair_scores_zero() {
        let matrix = TopologyHintMatrix::new();
        let (a, b) = (TopologyHintKey::new("27"), TopologyHintKey::new("51"));
        assert_eq!(matrix.score(&a, &b), 0);
    }

    #[test]
    fn test_from_devices_collapses_shared_keys() {
        // Four devices over two keys produce a 2-key matrix: two self pairs
        // plus one cross pair.
        let devices = vec![
            MockDevice::new("0", "27"),
            MockDevice::new("1", "27"),
            MockDevice::new("2", "51"),
            MockDevice::new("3", "51"),
        ];

        let mut classifier = StaticLinkClassifier::new();
        classifier.insert("27", "51", LinkCategory::SameCpu);

        let matrix = TopologyHintMatrix::from_devices(&devices, &classifier).unwrap();
        assert_eq!(matrix.entries().count(), 3);

        let (a, b) = (TopologyHintKey::new("27"), TopologyHintKey::new("51"));
        assert_eq!(matrix.score(&a, &a), LinkCategory::SameChip.score());
        assert_eq!(matrix.score(&a, &b), LinkCategory::SameCpu.score());
    }

    #[test]
    fn test_from_devices_propagates_classifier_errors() {
        struct FailingClassifier;

        impl LinkClassifier for FailingClassifier {
            fn classify(
                &self,
                a: &TopologyHintKey,
                _b: &TopologyHintKey,
            ) -> NpuletResult<LinkCategory> {
                Err(NpuletError::Topology(format!("{} not in topology tree", a)))
            }
        }

        let devices = mock_device_set(0..=1).into_vec();
        let result = TopologyHintMatrix::from_devices(&devices, &FailingClassifier);
        assert!(matches!(result, Err(NpuletError::Topology(_))));
    }

    #[test]
    fn test_score_device_set_sums_unordered_pairs() {
        let mut matrix = TopologyHintMatrix::new();
        matrix.insert("0", "1", 30);
        matrix.insert("0", "2", 20);
        matrix.insert("1", "2", 20);

        let devices = mock_device_set(0..=2).into_vec();
        assert_eq!(score_device_set(&matrix, &devices), 70);
        assert_eq!(score_device_set(&matrix, &devices[..1]), 0);
    }

    #[test]
    fn test_closure_provider() {
        let provider = FnHintProvider(|_: &TopologyHintKey, _: &TopologyHintKey| 5u32);
        let devices = mock_device_set(0..=3).into_vec();
        // C(4,2) pairs at 5 each.
        assert_eq!(score_device_set(&provider, &devices), 30);
    }
}
