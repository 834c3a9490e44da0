//! T-occurrence list merging
//!
//! Given sorted, duplicate-free postings lists and a threshold T, find
//! every id present on at least T of them, in ascending order. Two
//! interchangeable strategies:
//!
//! - `DivideSkipMerger`: heap merge with skips over the short lists,
//!   galloping membership probes into the longest ones
//! - `MergeOptMerger`: counting scan of the shortest lists, probes into
//!   the remaining T - 1
//!
//! A threshold of zero, or one larger than the number of lists, yields
//! an empty result by policy rather than an error: generated thresholds
//! routinely land out of range and an unmatchable query is not a fault.

pub(crate) mod cursor;
mod divide_skip;
mod merge_opt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use divide_skip::DivideSkipMerger;
pub use merge_opt::MergeOptMerger;

/// Strategy answering the T-occurrence problem over borrowed lists
pub trait ListMerger {
    /// All ids present in at least `threshold` of `lists`, ascending
    fn merge(&self, lists: &[&[u32]], threshold: usize) -> Vec<u32>;

    /// Like [`ListMerger::merge`], but gives up once `cancel` is set
    ///
    /// Returns `None` on cancellation. The input lists are only ever
    /// read, so an abandoned merge leaves nothing to clean up.
    fn merge_cancellable(
        &self,
        lists: &[&[u32]],
        threshold: usize,
        cancel: &CancelToken,
    ) -> Option<Vec<u32>>;
}

/// Cooperative cancellation flag shared between a caller and a merge
///
/// Cloning shares the flag. Merges poll it once per outer batch of
/// work, so cancellation is prompt but not instantaneous.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One-call merge with the default DivideSkip strategy
///
/// With `weighted` set, physically identical lists (clones of one
/// shared allocation, or the same slice passed twice) are collapsed
/// into a single weighted cursor; the result is identical to the
/// unweighted merge of the original inputs, just cheaper.
pub fn merge(lists: &[&[u32]], threshold: usize, weighted: bool) -> Vec<u32> {
    let merger = DivideSkipMerger::default();
    if weighted {
        merger.merge_weighted(lists, threshold)
    } else {
        merger.merge(lists, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_roundtrip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_top_level_merge_dispatch() {
        let a: &[u32] = &[1, 3, 5, 8];
        let b: &[u32] = &[2, 3, 6, 8];
        let c: &[u32] = &[3, 4, 8];

        assert_eq!(merge(&[a, b, c], 2, false), vec![3, 8]);
        assert_eq!(merge(&[a, b, c], 2, true), vec![3, 8]);
    }
}
