/*!
 * Tests for chunk partitioning
 */

use proptest::prelude::*;

use shiori::chunk_partitioner::{is_exact_cover, partition, PartitionLimits, Partitionable};

/// Sized item whose gap weight is the pause after it
#[derive(Debug, Clone)]
struct Item {
    size: usize,
    gap_after: i64,
}

impl Partitionable for Item {
    fn size(&self) -> usize {
        self.size
    }

    fn gap_weight(&self, _next: &Self) -> Option<i64> {
        Some(self.gap_after)
    }
}

fn items() -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec(
        (1usize..60, 0i64..10_000).prop_map(|(size, gap_after)| Item { size, gap_after }),
        0..40,
    )
}

fn group_size(group: &[Item]) -> usize {
    group.iter().map(|item| item.size).sum()
}

proptest! {
    #[test]
    fn test_partition_withoutReject_shouldCoverInputExactly(items in items(), max in 1usize..200) {
        let groups = partition(&items, &PartitionLimits::new(max));
        prop_assert!(is_exact_cover(&items, &groups));
    }

    #[test]
    fn test_partition_groups_shouldFitOrBeSingletons(items in items(), max in 1usize..200) {
        let groups = partition(&items, &PartitionLimits::new(max));
        for group in groups {
            prop_assert!(group.len() == 1 || group_size(group) <= max);
        }
    }

    #[test]
    fn test_partition_withForcedGap_shouldNeverSpanLongPause(
        items in items(),
        max in 1usize..200,
        forced in 1000i64..10_000,
    ) {
        let limits = PartitionLimits::new(max).with_forced_gap(forced);
        let groups = partition(&items, &limits);
        prop_assert!(is_exact_cover(&items, &groups));
        for group in groups {
            for item in &group[..group.len() - 1] {
                prop_assert!(item.gap_after < forced);
            }
        }
    }

    #[test]
    fn test_partition_withReject_shouldOnlyDropOversizedSingletons(items in items(), max in 1usize..40) {
        let reject = max * 2;
        let limits = PartitionLimits::new(max).with_reject_size(reject);
        let groups = partition(&items, &limits);

        let kept: usize = groups.iter().map(|g| g.len()).sum();
        let oversized = items.iter().filter(|item| item.size > reject).count();
        prop_assert_eq!(kept, items.len() - oversized);
        for group in groups {
            prop_assert!(group.len() == 1 || group_size(group) <= max);
            prop_assert!(group.iter().all(|item| item.size <= reject));
        }
    }
}

/// Test the largest pause is chosen as the split point
#[test]
fn test_partition_withOneLongPause_shouldSplitThere() {
    let items = vec![
        Item { size: 30, gap_after: 100 },
        Item { size: 30, gap_after: 4000 },
        Item { size: 30, gap_after: 200 },
        Item { size: 30, gap_after: 0 },
    ];
    let groups = partition(&items, &PartitionLimits::new(80));

    let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    assert_eq!(sizes, vec![2, 2]);
}

/// Test a small document stays in one group
#[test]
fn test_partition_withinLimit_shouldKeepOneGroup() {
    let items = vec![Item { size: 10, gap_after: 100 }, Item { size: 10, gap_after: 100 }];
    let groups = partition(&items, &PartitionLimits::new(80));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}
