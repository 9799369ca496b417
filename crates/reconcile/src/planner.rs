//! Batch planner - groups targets into one mutation request per partition
//!
//! A remote batch call accepts many targets but exactly one target value
//! (for updates: one commit). Targets are therefore grouped by a partition
//! key, and a batch never mixes keys.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

/// Targets sharing one partition key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<K, T> {
    /// Partition key shared by every item
    pub key: K,
    /// Items in first-seen order
    pub items: Vec<T>,
}

/// A set of batches, ordered by partition key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan<K, T> {
    batches: Vec<Batch<K, T>>,
    /// Number of targets dropped because their identity was already planned
    pub duplicates: usize,
}

impl<K: Ord + Clone, T> BatchPlan<K, T> {
    /// Partition targets in a single pass
    ///
    /// Targets are deduplicated by `identity` (first occurrence wins) so that
    /// every target lands in exactly one batch exactly once.
    pub fn build<I, Id>(
        targets: I,
        identity: impl Fn(&T) -> Id,
        key_of: impl Fn(&T) -> K,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        Id: Eq + Hash,
    {
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        let mut groups: BTreeMap<K, Vec<T>> = BTreeMap::new();

        for target in targets {
            if !seen.insert(identity(&target)) {
                duplicates += 1;
                continue;
            }
            groups.entry(key_of(&target)).or_default().push(target);
        }

        Self {
            batches: groups
                .into_iter()
                .map(|(key, items)| Batch { key, items })
                .collect(),
            duplicates,
        }
    }

    /// Drop items failing a predicate, then drop batches left empty
    ///
    /// Returns the removed items with their partition key.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &T) -> bool) -> Vec<(K, T)> {
        let mut removed = Vec::new();
        for batch in &mut self.batches {
            let items = std::mem::take(&mut batch.items);
            for item in items {
                if keep(&batch.key, &item) {
                    batch.items.push(item);
                } else {
                    removed.push((batch.key.clone(), item));
                }
            }
        }
        self.batches.retain(|b| !b.items.is_empty());
        removed
    }

    /// The planned batches
    pub fn batches(&self) -> &[Batch<K, T>] {
        &self.batches
    }

    /// Consume the plan into its batches
    pub fn into_batches(self) -> Vec<Batch<K, T>> {
        self.batches
    }

    /// Partition keys in plan order
    pub fn keys(&self) -> Vec<K> {
        self.batches.iter().map(|b| b.key.clone()).collect()
    }

    /// Total number of planned items
    pub fn total_items(&self) -> usize {
        self.batches.iter().map(|b| b.items.len()).sum()
    }

    /// Check if there is nothing to submit
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// The one partition key every target shares
///
/// Returns `None` for no targets and [`Error::MixedPartitions`] when targets
/// disagree. Used by flows that must not be split across partitions.
pub fn single_partition<K, T>(targets: &[T], key_of: impl Fn(&T) -> K) -> Result<Option<K>>
where
    K: Ord + Display,
{
    let keys: BTreeMap<K, ()> = targets.iter().map(|t| (key_of(t), ())).collect();
    let mut keys = keys.into_keys();
    match (keys.next(), keys.len()) {
        (None, _) => Ok(None),
        (Some(key), 0) => Ok(Some(key)),
        (Some(first), _) => Err(Error::MixedPartitions {
            keys: std::iter::once(first)
                .chain(keys)
                .map(|k| k.to_string())
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Target {
        id: u32,
        set: u32,
    }

    fn t(id: u32, set: u32) -> Target {
        Target { id, set }
    }

    #[test]
    fn test_build_groups_by_key() {
        let plan = BatchPlan::build(
            vec![t(1, 10), t(2, 20), t(3, 10)],
            |x| x.id,
            |x| x.set,
        );
        assert_eq!(plan.keys(), vec![10, 20]);
        assert_eq!(plan.batches()[0].items, vec![t(1, 10), t(3, 10)]);
        assert_eq!(plan.batches()[1].items, vec![t(2, 20)]);
        assert_eq!(plan.total_items(), 3);
    }

    #[test]
    fn test_build_empty() {
        let plan = BatchPlan::build(Vec::<Target>::new(), |x| x.id, |x| x.set);
        assert!(plan.is_empty());
        assert_eq!(plan.total_items(), 0);
    }

    #[test]
    fn test_duplicates_dropped() {
        let plan = BatchPlan::build(vec![t(1, 10), t(1, 10), t(2, 10)], |x| x.id, |x| x.set);
        assert_eq!(plan.total_items(), 2);
        assert_eq!(plan.duplicates, 1);
    }

    #[test]
    fn test_partition_correctness_over_generated_inputs() {
        // Small LCG so the test is deterministic without extra crates
        let mut state = 0x2545_f491_u64;
        let mut next = move |m: u64| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (state >> 33) % m
        };

        for _ in 0..200 {
            let len = next(30) as usize;
            let targets: Vec<Target> = (0..len)
                .map(|_| t(next(20) as u32, next(4) as u32))
                .collect();

            let plan = BatchPlan::build(targets.clone(), |x| x.id, |x| x.set);

            let mut seen = BTreeSet::new();
            for batch in plan.batches() {
                assert!(!batch.items.is_empty());
                for item in &batch.items {
                    assert_eq!(item.set, batch.key);
                    assert!(seen.insert(item.id), "duplicate id {}", item.id);
                }
            }
            let expected: BTreeSet<u32> = targets.iter().map(|x| x.id).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_retain_drops_emptied_batches() {
        let mut plan = BatchPlan::build(vec![t(1, 10), t(2, 20), t(3, 20)], |x| x.id, |x| x.set);
        let removed = plan.retain(|_, item| item.id != 1 && item.id != 3);
        assert_eq!(removed, vec![(10, t(1, 10)), (20, t(3, 20))]);
        assert_eq!(plan.keys(), vec![20]);
        assert_eq!(plan.total_items(), 1);
    }

    #[test]
    fn test_single_partition() {
        assert_eq!(single_partition(&Vec::<Target>::new(), |x| x.set).unwrap(), None);
        assert_eq!(
            single_partition(&[t(1, 5), t(2, 5)], |x| x.set).unwrap(),
            Some(5)
        );
        assert_eq!(
            single_partition(&[t(1, 5), t(2, 6), t(3, 5)], |x| x.set).unwrap_err(),
            Error::MixedPartitions {
                keys: vec!["5".into(), "6".into()]
            }
        );
    }
}
