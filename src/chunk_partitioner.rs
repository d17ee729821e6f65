/*!
 * Balanced partitioning of ordered, sized items into bounded groups.
 *
 * One algorithm serves subtitle cues, sentences and paragraph pieces: a range that
 * is too large (or, for timed items, contains a long enough pause) is split at the
 * boundary with the highest gap weight, ties going to the boundary that halves the
 * size most evenly. Ranges are processed from an explicit work list, so deep splits
 * never grow the call stack.
 */

use log::debug;
use std::ops::Range;

/// Gap weight for a boundary that should almost never be split
pub const CONTINUATION_GAP_WEIGHT: i64 = i64::MIN;

/// Capability an item needs to take part in partitioning
pub trait Partitionable {
    /// Size counted against the group limit
    fn size(&self) -> usize;

    /// Weight of the boundary between this item and the next one. Higher weights
    /// are split first; `None` means boundaries are chosen on balance alone.
    fn gap_weight(&self, _next: &Self) -> Option<i64> {
        None
    }
}

/// Size limits for one partitioning call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionLimits {
    /// Largest total size of a multi-item group
    pub max_size: usize,
    /// A lone item above this size is dropped instead of forming a group
    pub reject_size: Option<usize>,
    /// A boundary weight at or above this value is always split
    pub forced_gap: Option<i64>,
}

impl PartitionLimits {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            reject_size: None,
            forced_gap: None,
        }
    }

    pub fn with_reject_size(mut self, reject_size: usize) -> Self {
        self.reject_size = Some(reject_size);
        self
    }

    pub fn with_forced_gap(mut self, forced_gap: i64) -> Self {
        self.forced_gap = Some(forced_gap);
        self
    }
}

/// Partition `items` into ordered groups borrowed from the input.
///
/// Every group either fits `max_size` or is a single item. Apart from rejected
/// single items, concatenating the groups yields the input in order.
pub fn partition<'a, T: Partitionable>(items: &'a [T], limits: &PartitionLimits) -> Vec<&'a [T]> {
    let mut groups = Vec::new();
    if items.is_empty() {
        return groups;
    }

    // Ranges still to examine; the left half is pushed last so output stays ordered
    let mut pending: Vec<Range<usize>> = vec![0..items.len()];

    while let Some(range) = pending.pop() {
        let slice = &items[range.clone()];

        if slice.len() == 1 {
            let size = slice[0].size();
            if limits.reject_size.is_some_and(|reject| size > reject) {
                debug!("Dropping oversized item at {} ({} chars)", range.start, size);
                continue;
            }
            groups.push(slice);
            continue;
        }

        match choose_split(slice, limits) {
            Some(at) => {
                pending.push(range.start + at..range.end);
                pending.push(range.start..range.start + at);
            }
            None => groups.push(slice),
        }
    }

    groups
}

/// Pick the boundary to split a multi-item slice at, or `None` to keep it whole
fn choose_split<T: Partitionable>(slice: &[T], limits: &PartitionLimits) -> Option<usize> {
    let total: usize = slice.iter().map(Partitionable::size).sum();
    let gaps: Vec<Option<i64>> = slice.windows(2).map(|w| w[0].gap_weight(&w[1])).collect();
    let biggest_gap = gaps.iter().copied().max().flatten();

    let forced = matches!(
        (limits.forced_gap, biggest_gap),
        (Some(forced), Some(gap)) if gap >= forced
    );
    if total <= limits.max_size && !forced {
        return None;
    }

    // (distance from the midpoint, boundary index); first candidate wins ties
    let mut best: Option<(usize, usize)> = None;
    let mut cumulative = 0;
    for (idx, item) in slice[..slice.len() - 1].iter().enumerate() {
        cumulative += item.size();
        if gaps[idx] != biggest_gap {
            continue;
        }
        let distance = (2 * cumulative).abs_diff(total);
        if best.is_none_or(|(best_distance, _)| distance < best_distance) {
            best = Some((distance, idx + 1));
        }
    }

    best.map(|(_, boundary)| boundary)
}

/// True when the groups are consecutive, non-overlapping slices of `items` that
/// together cover all of it
pub fn is_exact_cover<T>(items: &[T], groups: &[&[T]]) -> bool {
    let mut offset = 0;
    for group in groups {
        if group.is_empty() || offset + group.len() > items.len() {
            return false;
        }
        if !std::ptr::eq(group.as_ptr(), items[offset..].as_ptr()) {
            return false;
        }
        offset += group.len();
    }
    offset == items.len()
}
