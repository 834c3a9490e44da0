//! MergeOpt threshold merging
//!
//! Of n lists, an id reaching threshold T must appear in at least one of
//! the n - T + 1 shortest: it can miss at most n - T lists in total. So
//! those short lists are scanned into a counting array and only the ids
//! they surface are checked, by galloping probes, against the T - 1
//! longest lists.
//!
//! The counting array spans the observed id range of the short lists,
//! trading memory proportional to that span for hash-free counting;
//! dictionary ids are dense positions, so the span stays at most the
//! dictionary size.

use tracing::trace;

use super::cursor::ListCursor;
use super::{CancelToken, ListMerger};

/// Threshold merger that counts the short lists and probes the rest
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeOptMerger;

impl MergeOptMerger {
    pub fn new() -> Self {
        Self
    }

    fn merge_inner(
        &self,
        lists: &[&[u32]],
        threshold: usize,
        cancel: Option<&CancelToken>,
    ) -> Option<Vec<u32>> {
        if threshold == 0 || threshold > lists.len() {
            return Some(Vec::new());
        }

        let mut order: Vec<&[u32]> = lists.to_vec();
        order.sort_by_key(|l| l.len());
        let num_short = order.len() - threshold + 1;
        let (short, long) = order.split_at(num_short);

        // Id span actually covered by the short lists.
        let mut min_id = u32::MAX;
        let mut max_id = 0u32;
        let mut populated = false;
        for list in short {
            if let (Some(&first), Some(&last)) = (list.first(), list.last()) {
                populated = true;
                min_id = min_id.min(first);
                max_id = max_id.max(last);
            }
        }
        if !populated {
            // Every short list is empty, so no id can appear more than
            // threshold - 1 times.
            return Some(Vec::new());
        }

        let span = (max_id - min_id) as usize + 1;
        let mut counts = vec![0u32; span];
        for list in short {
            for &id in *list {
                counts[(id - min_id) as usize] += 1;
            }
        }
        trace!(
            short = short.len(),
            long = long.len(),
            span,
            "merge opt counting pass"
        );

        let mut probes: Vec<ListCursor> = long.iter().map(|&l| ListCursor::new(l)).collect();
        let mut results = Vec::new();

        for (offset, &seen) in counts.iter().enumerate() {
            if seen == 0 {
                continue;
            }
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return None;
                }
            }

            let id = min_id + offset as u32;
            let mut count = seen as usize;
            if count < threshold {
                for (j, probe) in probes.iter_mut().enumerate() {
                    if count + (long.len() - j) < threshold {
                        break;
                    }
                    if probe.contains_from(id) {
                        count += 1;
                    }
                    if count >= threshold {
                        break;
                    }
                }
            }
            if count >= threshold {
                results.push(id);
            }
        }

        Some(results)
    }
}

impl ListMerger for MergeOptMerger {
    fn merge(&self, lists: &[&[u32]], threshold: usize) -> Vec<u32> {
        self.merge_inner(lists, threshold, None).unwrap_or_default()
    }

    fn merge_cancellable(
        &self,
        lists: &[&[u32]],
        threshold: usize,
        cancel: &CancelToken,
    ) -> Option<Vec<u32>> {
        self.merge_inner(lists, threshold, Some(cancel))
    }
}
