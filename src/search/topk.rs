//! Exact top-k search with a rising merge threshold
//!
//! Scoring every entry that shares a gram with the query is correct but
//! wasteful. The selector instead runs one incremental merge over the
//! query's postings lists and keeps a bounded best-k heap. Once the
//! heap is full, its worst score plus the metric's overlap bound and
//! the largest dictionary weight still ahead fix the minimum gram
//! overlap any unseen id needs; as that requirement rises the longest
//! lists flip from heap merging to galloping probes. Cursor positions
//! survive the flip, so the merge never restarts. A configured score
//! floor plays the same role before the heap fills.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;
use tracing::trace;

use crate::config::{MergeConfig, TopKConfig};
use crate::dictionary::{Dictionary, StringId};
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::merge::cursor::{ListCursor, FRONTIER_SENTINEL};

use super::metric::SimilarityMetric;
use super::query::Query;
use super::SearchHit;

/// Heap entry ordered worst-first: lower score, then larger id
#[derive(PartialEq, Eq)]
struct Ranked {
    score: OrderedFloat<f64>,
    id: StringId,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded best-k collection with its worst entry at the root
struct BestK {
    cap: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl BestK {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            heap: BinaryHeap::with_capacity(cap + 1),
        }
    }

    /// Worst retained score once k entries are held
    fn floor_score(&self) -> Option<f64> {
        if self.heap.len() >= self.cap {
            self.heap.peek().map(|Reverse(e)| e.score.0)
        } else {
            None
        }
    }

    fn offer(&mut self, id: StringId, score: f64) {
        let entry = Ranked {
            score: OrderedFloat(score),
            id,
        };
        if self.heap.len() < self.cap {
            self.heap.push(Reverse(entry));
        } else if let Some(Reverse(worst)) = self.heap.peek() {
            // Ties keep the smaller id, which `Ranked` orders higher.
            if entry > *worst {
                self.heap.pop();
                self.heap.push(Reverse(entry));
            }
        }
    }

    /// Best first: descending score, ascending id on ties
    fn into_hits(self) -> Vec<SearchHit> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(e)| SearchHit {
                id: e.id,
                score: e.score.0,
            })
            .collect()
    }
}

/// Top-k search over an index and its dictionary
pub struct TopKSelector<'a, M> {
    index: &'a InvertedIndex,
    dictionary: &'a Dictionary,
    metric: &'a M,
    config: TopKConfig,
    merge_config: MergeConfig,
}

impl<'a, M: SimilarityMetric> TopKSelector<'a, M> {
    pub fn new(index: &'a InvertedIndex, dictionary: &'a Dictionary, metric: &'a M) -> Self {
        Self {
            index,
            dictionary,
            metric,
            config: TopKConfig::default(),
            merge_config: MergeConfig::default(),
        }
    }

    /// Override the threshold re-check cadence
    pub fn with_config(mut self, config: TopKConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the long-list split tuning
    pub fn with_merge_config(mut self, config: MergeConfig) -> Self {
        self.merge_config = config;
        self
    }

    /// The k best entries for the query, best first
    ///
    /// Equivalent to scoring every dictionary entry sharing at least one
    /// query gram and keeping the k best by weight-adjusted score, ties
    /// to the smaller id; a configured score floor additionally drops
    /// hits below it. When k reaches the dictionary size every entry is
    /// scored. A query sharing no grams yields nothing.
    pub fn select(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.index.check_dictionary(self.dictionary)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = Query::top_k(self.index.codec(), text, k)?;
        if k >= self.dictionary.len() {
            return Ok(self.scan_all(query.text()));
        }
        Ok(self.run_merge(&query, k))
    }

    /// Score the whole dictionary; the k >= entries case
    fn scan_all(&self, text: &str) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .dictionary
            .iter()
            .map(|(id, entry)| SearchHit {
                id,
                score: self.dictionary.weight(id) * self.metric.score(text, entry),
            })
            .filter(|hit| self.meets_floor(hit.score))
            .collect();
        hits.sort_by_key(|h| (Reverse(OrderedFloat(h.score)), h.id));
        hits
    }

    fn meets_floor(&self, score: f64) -> bool {
        self.config.score_floor.map_or(true, |floor| score >= floor)
    }

    fn run_merge(&self, query: &Query, k: usize) -> Vec<SearchHit> {
        // Distinct postings lists with gram multiplicities, collapsed by
        // allocation so coalesced lists carry their summed weight.
        let mut by_ptr: HashMap<(usize, usize), usize> = HashMap::new();
        let mut lists: Vec<(&[u32], usize)> = Vec::new();
        for &(gram, mult) in query.unique_grams() {
            let list = self.index.list(gram);
            if list.is_empty() {
                continue;
            }
            let key = (list.as_ptr() as usize, list.len());
            if let Some(&pos) = by_ptr.get(&key) {
                lists[pos].1 += mult;
            } else {
                by_ptr.insert(key, lists.len());
                lists.push((list, mult));
            }
        }
        if lists.is_empty() {
            return Vec::new();
        }

        lists.sort_by_key(|&(list, _)| list.len());
        let weights: Vec<usize> = lists.iter().map(|&(_, w)| w).collect();
        let total_weight: usize = weights.iter().sum();
        let longest = lists.last().map_or(0, |&(l, _)| l.len());

        let mut cursors: Vec<ListCursor> = lists.iter().map(|&(l, _)| ListCursor::new(l)).collect();

        let mut best = BestK::new(k);
        let mut threshold = 1usize;
        // lists[..split] feed the heap; lists[split..] answer probes.
        let mut split = lists.len();
        let mut long_weight = 0usize;
        let mut long_suffix: Vec<usize> = vec![0];

        // A configured floor bounds the overlap before anything is
        // scored; without one pruning starts once the heap fills.
        if let Some(floor) = self.config.score_floor {
            let max_weight = self.dictionary.max_weight();
            let needed = self.required_overlap(query, floor, max_weight, 1, total_weight);
            if needed > total_weight {
                return Vec::new();
            }
            if needed > threshold {
                threshold = needed;
                let (s, lw, suffix) = self.resplit(&weights, threshold, longest);
                split = s;
                long_weight = lw;
                long_suffix = suffix;
            }
        }

        let mut heap: BinaryHeap<Reverse<(u32, usize)>> = cursors[..split]
            .iter()
            .enumerate()
            .map(|(i, c)| Reverse((c.head(), i)))
            .collect();

        let mut popped: Vec<usize> = Vec::with_capacity(lists.len());
        let mut scored_since = 0usize;

        loop {
            let current = match heap.peek() {
                Some(&Reverse((head, _))) => head,
                None => break,
            };
            if current == FRONTIER_SENTINEL {
                // Ids left only on probed lists carry at most
                // threshold - 1 weight and can never reach the floor.
                break;
            }

            popped.clear();
            let mut popped_weight = 0usize;
            while let Some(&Reverse((head, idx))) = heap.peek() {
                if head != current {
                    break;
                }
                heap.pop();
                popped.push(idx);
                popped_weight += weights[idx];
            }

            let short_threshold = threshold - long_weight;
            if popped_weight >= short_threshold {
                let mut count = popped_weight;
                if count < threshold {
                    for j in split..cursors.len() {
                        if count + long_suffix[j - split] < threshold {
                            break;
                        }
                        if cursors[j].contains_from(current) {
                            count += weights[j];
                        }
                        if count >= threshold {
                            break;
                        }
                    }
                }
                if count >= threshold {
                    if let Some(entry) = self.dictionary.get(current) {
                        let score =
                            self.dictionary.weight(current) * self.metric.score(query.text(), entry);
                        if self.meets_floor(score) {
                            best.offer(current, score);
                        }
                        scored_since += 1;
                    }
                }
                for &idx in &popped {
                    cursors[idx].advance();
                    heap.push(Reverse((cursors[idx].head(), idx)));
                }
            } else {
                while let Some(&Reverse((head, idx))) = heap.peek() {
                    if head == FRONTIER_SENTINEL {
                        break;
                    }
                    if popped_weight + weights[idx] > short_threshold - 1 {
                        break;
                    }
                    heap.pop();
                    popped.push(idx);
                    popped_weight += weights[idx];
                }
                let jump = heap
                    .peek()
                    .map_or(FRONTIER_SENTINEL, |&Reverse((head, _))| head);
                for &idx in &popped {
                    cursors[idx].seek(jump);
                    heap.push(Reverse((cursors[idx].head(), idx)));
                }
            }

            if scored_since >= self.config.recheck_interval {
                scored_since = 0;
                let floor = match (self.config.score_floor, best.floor_score()) {
                    (Some(configured), Some(worst)) => Some(configured.max(worst)),
                    (Some(configured), None) => Some(configured),
                    (None, worst) => worst,
                };
                if let Some(floor) = floor {
                    let max_unseen = self.dictionary.max_weight_from(current.saturating_add(1));
                    let needed =
                        self.required_overlap(query, floor, max_unseen, threshold, total_weight);
                    if needed > total_weight {
                        // Even a full-overlap id ahead cannot beat the
                        // floor.
                        break;
                    }
                    if needed > threshold {
                        threshold = needed;
                        let (new_split, new_long_weight, new_suffix) =
                            self.resplit(&weights, threshold, longest);
                        // The threshold only rises, so lists never move
                        // back from probing to the heap.
                        if new_split < split {
                            split = new_split;
                            long_weight = new_long_weight;
                            long_suffix = new_suffix;
                            heap = cursors[..split]
                                .iter()
                                .enumerate()
                                .map(|(i, c)| Reverse((c.head(), i)))
                                .collect();
                        }
                        trace!(threshold, split, "raised top-k overlap threshold");
                    }
                }
            }
        }

        best.into_hits()
    }

    /// Smallest overlap whose best reachable score still meets the
    /// floor; `total_weight + 1` when nothing ahead can
    fn required_overlap(
        &self,
        query: &Query,
        floor: f64,
        max_unseen_weight: f64,
        from: usize,
        total_weight: usize,
    ) -> usize {
        let mut overlap = from.max(1);
        while overlap <= total_weight {
            if max_unseen_weight * self.metric.overlap_bound(query.profile(), overlap) >= floor {
                return overlap;
            }
            overlap += 1;
        }
        total_weight + 1
    }

    /// Long/short split for a threshold, as DivideSkip draws it: up to
    /// the budget's worth of the longest lists, combined weight capped
    /// below the threshold
    fn resplit(
        &self,
        weights: &[usize],
        threshold: usize,
        longest: usize,
    ) -> (usize, usize, Vec<usize>) {
        let denom = self.merge_config.mu * (longest as f64).log2() + 1.0;
        let budget = ((threshold as f64 / denom).floor() as usize).min(threshold - 1);

        let mut split = weights.len();
        let mut long_weight = 0usize;
        while split > 0 && weights.len() - split < budget {
            let w = weights[split - 1];
            if long_weight + w > threshold - 1 {
                break;
            }
            long_weight += w;
            split -= 1;
        }

        let long = &weights[split..];
        let mut suffix = vec![0usize; long.len() + 1];
        for j in (0..long.len()).rev() {
            suffix[j] = suffix[j + 1] + long[j];
        }

        (split, long_weight, suffix)
    }
}

/// The k most similar entries with their weight-adjusted scores
pub fn top_k_scored<M: SimilarityMetric>(
    index: &InvertedIndex,
    dictionary: &Dictionary,
    query: &str,
    metric: &M,
    k: usize,
) -> Result<Vec<SearchHit>> {
    TopKSelector::new(index, dictionary, metric).select(query, k)
}

/// The k most similar ids, best first
pub fn top_k<M: SimilarityMetric>(
    index: &InvertedIndex,
    dictionary: &Dictionary,
    query: &str,
    metric: &M,
    k: usize,
) -> Result<Vec<StringId>> {
    Ok(top_k_scored(index, dictionary, query, metric, k)?
        .into_iter()
        .map(|hit| hit.id)
        .collect())
}
