//! DivideSkip threshold merging
//!
//! The lists are split by length. The longest few carry most of the
//! merge cost but can only confirm candidates, so they are probed with
//! galloping cursors instead of merged. The remaining short lists run
//! through MergeSkip: a min-heap of cursors that pops each smallest id,
//! and when the id cannot reach the adjusted threshold, pops just enough
//! further cursors to rule it out and leapfrogs them all to the next
//! head still in the heap.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::trace;

use crate::config::MergeConfig;

use super::cursor::{ListCursor, FRONTIER_SENTINEL};
use super::{CancelToken, ListMerger};

/// A distinct list carrying the multiplicity it stands for
struct WeightedList<'a> {
    list: &'a [u32],
    weight: usize,
}

/// Collapse physically identical slices into one entry with a weight
///
/// Identity is pointer plus length, which catches both a slice passed
/// twice (a query gram repeated) and clones of one coalesced allocation.
/// Content-equal lists in separate allocations simply stay separate;
/// detection is an optimization, never a correctness requirement.
fn collapse_duplicates<'a>(lists: &[&'a [u32]]) -> Vec<WeightedList<'a>> {
    let mut seen: HashMap<(usize, usize), usize> = HashMap::new();
    let mut out: Vec<WeightedList<'a>> = Vec::with_capacity(lists.len());

    for &list in lists {
        let key = (list.as_ptr() as usize, list.len());
        match seen.entry(key) {
            std::collections::hash_map::Entry::Occupied(slot) => {
                out[*slot.get()].weight += 1;
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(WeightedList { list, weight: 1 });
            }
        }
    }
    out
}

/// Threshold merger that heap-merges short lists and probes long ones
#[derive(Clone, Debug, Default)]
pub struct DivideSkipMerger {
    config: MergeConfig,
}

impl DivideSkipMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// How many of the longest lists to probe rather than merge
    ///
    /// floor(threshold / (mu * log2(longest) + 1)), never the whole
    /// threshold: at least one occurrence must always come from the
    /// merged short lists or skipped gaps could hide qualifying ids.
    fn long_budget(&self, threshold: usize, longest: usize) -> usize {
        let denom = self.config.mu * (longest as f64).log2() + 1.0;
        let budget = (threshold as f64 / denom).floor() as usize;
        budget.min(threshold - 1)
    }

    /// Duplicate-aware merge: identical lists are counted by weight
    pub fn merge_weighted(&self, lists: &[&[u32]], threshold: usize) -> Vec<u32> {
        self.merge_core(collapse_duplicates(lists), threshold, None)
            .unwrap_or_default()
    }

    /// Duplicate-aware merge with cooperative cancellation
    pub fn merge_weighted_cancellable(
        &self,
        lists: &[&[u32]],
        threshold: usize,
        cancel: &CancelToken,
    ) -> Option<Vec<u32>> {
        self.merge_core(collapse_duplicates(lists), threshold, Some(cancel))
    }

    fn merge_core(
        &self,
        mut lists: Vec<WeightedList<'_>>,
        threshold: usize,
        cancel: Option<&CancelToken>,
    ) -> Option<Vec<u32>> {
        let total_weight: usize = lists.iter().map(|l| l.weight).sum();
        if threshold == 0 || threshold > total_weight {
            return Some(Vec::new());
        }

        // Empty lists hold no ids; dropping them leaves the threshold
        // meaning unchanged but may make it unreachable.
        lists.retain(|l| !l.list.is_empty());
        let live_weight: usize = lists.iter().map(|l| l.weight).sum();
        if threshold > live_weight {
            return Some(Vec::new());
        }

        lists.sort_by_key(|l| l.list.len());
        let longest = lists.last().map_or(0, |l| l.list.len());

        // Pick long lists from the longest down, capped by the budget
        // and by the rule that their combined weight stays below the
        // threshold.
        let budget = self.long_budget(threshold, longest);
        let mut long_weight = 0usize;
        let mut split = lists.len();
        while split > 0 && lists.len() - split < budget {
            let w = lists[split - 1].weight;
            if long_weight + w > threshold - 1 {
                break;
            }
            long_weight += w;
            split -= 1;
        }

        let (short, long) = lists.split_at(split);
        let short_threshold = threshold - long_weight;
        trace!(
            short = short.len(),
            long = long.len(),
            short_threshold,
            "divide skip split"
        );

        // Weight of long[j..], for the early-termination test.
        let mut long_suffix = vec![0usize; long.len() + 1];
        for j in (0..long.len()).rev() {
            long_suffix[j] = long_suffix[j + 1] + long[j].weight;
        }

        let mut cursors: Vec<ListCursor> = short.iter().map(|l| ListCursor::new(l.list)).collect();
        let mut probes: Vec<ListCursor> = long.iter().map(|l| ListCursor::new(l.list)).collect();
        let mut heap: BinaryHeap<Reverse<(u32, usize)>> = cursors
            .iter()
            .enumerate()
            .map(|(i, c)| Reverse((c.head(), i)))
            .collect();

        let mut results = Vec::new();
        let mut popped: Vec<usize> = Vec::with_capacity(short.len());

        loop {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return None;
                }
            }

            let current = match heap.peek() {
                Some(&Reverse((head, _))) => head,
                None => break,
            };
            if current == FRONTIER_SENTINEL {
                break;
            }

            // Pop every cursor sitting on the current id.
            popped.clear();
            let mut popped_weight = 0usize;
            while let Some(&Reverse((head, idx))) = heap.peek() {
                if head != current {
                    break;
                }
                heap.pop();
                popped.push(idx);
                popped_weight += short[idx].weight;
            }

            if popped_weight >= short_threshold {
                let mut count = popped_weight;
                if count < threshold {
                    for (j, probe) in probes.iter_mut().enumerate() {
                        if count + long_suffix[j] < threshold {
                            break;
                        }
                        if probe.contains_from(current) {
                            count += long[j].weight;
                        }
                        if count >= threshold {
                            break;
                        }
                    }
                }
                if count >= threshold {
                    results.push(current);
                }
                for &idx in &popped {
                    cursors[idx].advance();
                    heap.push(Reverse((cursors[idx].head(), idx)));
                }
            } else {
                // The current id is short of the threshold. Keep popping
                // the smallest heads while the popped weight stays below
                // the adjusted threshold; whatever id those cursors hold
                // next cannot qualify either, so they all leapfrog to
                // the smallest head left in the heap.
                while let Some(&Reverse((head, idx))) = heap.peek() {
                    if head == FRONTIER_SENTINEL {
                        break;
                    }
                    if popped_weight + short[idx].weight > short_threshold - 1 {
                        break;
                    }
                    heap.pop();
                    popped.push(idx);
                    popped_weight += short[idx].weight;
                }

                let jump = heap
                    .peek()
                    .map_or(FRONTIER_SENTINEL, |&Reverse((head, _))| head);
                for &idx in &popped {
                    cursors[idx].seek(jump);
                    heap.push(Reverse((cursors[idx].head(), idx)));
                }
            }
        }

        Some(results)
    }
}

impl ListMerger for DivideSkipMerger {
    fn merge(&self, lists: &[&[u32]], threshold: usize) -> Vec<u32> {
        let weighted = lists
            .iter()
            .map(|&list| WeightedList { list, weight: 1 })
            .collect();
        self.merge_core(weighted, threshold, None).unwrap_or_default()
    }

    fn merge_cancellable(
        &self,
        lists: &[&[u32]],
        threshold: usize,
        cancel: &CancelToken,
    ) -> Option<Vec<u32>> {
        let weighted = lists
            .iter()
            .map(|&list| WeightedList { list, weight: 1 })
            .collect();
        self.merge_core(weighted, threshold, Some(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(lists: &[&[u32]], threshold: usize) -> Vec<u32> {
        if threshold == 0 || threshold > lists.len() {
            return Vec::new();
        }
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for list in lists {
            for &id in *list {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut out: Vec<u32> = counts
            .into_iter()
            .filter(|&(_, c)| c >= threshold)
            .map(|(id, _)| id)
            .collect();
        out.sort_unstable();
        out
    }

    fn fixture() -> Vec<&'static [u32]> {
        vec![&[1, 3, 5, 8], &[2, 3, 6, 8], &[3, 4, 8]]
    }

    #[test]
    fn test_threshold_two_and_three() {
        let merger = DivideSkipMerger::default();
        assert_eq!(merger.merge(&fixture(), 2), vec![3, 8]);
        assert_eq!(merger.merge(&fixture(), 3), vec![3]);
    }

    #[test]
    fn test_threshold_one_is_sorted_union() {
        let merger = DivideSkipMerger::default();
        assert_eq!(merger.merge(&fixture(), 1), vec![1, 2, 3, 4, 5, 6, 8]);
    }

    #[test]
    fn test_degenerate_thresholds_empty() {
        let merger = DivideSkipMerger::default();
        assert!(merger.merge(&fixture(), 0).is_empty());
        assert!(merger.merge(&fixture(), 4).is_empty());
        assert!(merger.merge(&[], 1).is_empty());
    }

    #[test]
    fn test_empty_lists_count_toward_threshold_bound() {
        let merger = DivideSkipMerger::default();
        let lists: Vec<&[u32]> = vec![&[], &[], &[1, 2]];
        // Three lists admit threshold 3, but two are empty so no id can
        // reach it.
        assert!(merger.merge(&lists, 3).is_empty());
        assert_eq!(merger.merge(&lists, 1), vec![1, 2]);
    }

    #[test]
    fn test_matches_brute_force_across_thresholds() {
        let merger = DivideSkipMerger::default();
        let lists: Vec<&[u32]> = vec![
            &[0, 4, 9, 12, 13, 40, 41, 42],
            &[4, 9, 40],
            &[2, 4, 6, 8, 10, 12, 40],
            &[4, 40, 41],
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 40],
        ];
        for threshold in 0..=6 {
            assert_eq!(
                merger.merge(&lists, threshold),
                brute_force(&lists, threshold),
                "threshold {}",
                threshold
            );
        }
    }

    #[test]
    fn test_mu_extremes_agree() {
        // A huge mu forces a pure heap merge; a tiny one maximizes
        // probing. Either way the answer is the same.
        let heavy_merge = DivideSkipMerger::new(MergeConfig::default().with_mu(1000.0));
        let heavy_probe = DivideSkipMerger::new(MergeConfig::default().with_mu(1e-9));

        let lists: Vec<&[u32]> = vec![
            &[1, 5, 7, 9, 11, 15, 21, 30, 31, 32, 33],
            &[5, 9, 30],
            &[2, 5, 9, 14, 30, 33],
            &[5, 30],
        ];
        for threshold in 1..=4 {
            let expected = brute_force(&lists, threshold);
            assert_eq!(heavy_merge.merge(&lists, threshold), expected);
            assert_eq!(heavy_probe.merge(&lists, threshold), expected);
        }
    }

    #[test]
    fn test_weighted_collapses_shared_slices() {
        let merger = DivideSkipMerger::default();
        let shared: &[u32] = &[1, 2, 3];
        let other: &[u32] = &[2, 3];

        // The shared slice appears twice, so ids on it get weight 2.
        let lists = vec![shared, shared, other];
        assert_eq!(merger.merge_weighted(&lists, 3), vec![2, 3]);
        assert_eq!(merger.merge_weighted(&lists, 2), vec![1, 2, 3]);

        // Same answers as treating the duplicate as an ordinary list.
        assert_eq!(merger.merge(&lists, 3), vec![2, 3]);
        assert_eq!(merger.merge(&lists, 2), vec![1, 2, 3]);
    }

    #[test]
    fn test_weighted_degenerate_thresholds() {
        let merger = DivideSkipMerger::default();
        let shared: &[u32] = &[4, 7];
        let lists = vec![shared, shared];

        // Threshold compares against the original list count.
        assert_eq!(merger.merge_weighted(&lists, 2), vec![4, 7]);
        assert!(merger.merge_weighted(&lists, 3).is_empty());
    }

    #[test]
    fn test_cancellation_stops_merge() {
        let merger = DivideSkipMerger::default();
        let token = CancelToken::new();
        token.cancel();

        let lists = fixture();
        assert_eq!(merger.merge_cancellable(&lists, 2, &token), None);

        let fresh = CancelToken::new();
        assert_eq!(
            merger.merge_cancellable(&lists, 2, &fresh),
            Some(vec![3, 8])
        );
    }

    #[test]
    fn test_single_list() {
        let merger = DivideSkipMerger::default();
        let lists: Vec<&[u32]> = vec![&[2, 9, 14]];
        assert_eq!(merger.merge(&lists, 1), vec![2, 9, 14]);
        assert!(merger.merge(&lists, 2).is_empty());
    }
}
