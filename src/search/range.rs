//! Threshold similarity search
//!
//! A score cutoff becomes a gram overlap threshold through the metric's
//! admissible bound, the threshold merge surfaces every id that can
//! still reach the cutoff, and the metric verifies the survivors. The
//! edit-distance variant uses the count filter directly.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::dictionary::{Dictionary, StringId};
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::merge::DivideSkipMerger;

use super::metric::{levenshtein_distance, SimilarityMetric};
use super::query::Query;
use super::SearchHit;

/// All entries scoring at least `min_score`, best first
///
/// Exact for any metric with a sound overlap bound: entries below the
/// derived gram threshold cannot reach the cutoff, and everything else
/// is verified against the real score. Ties order by ascending id.
/// Cutoffs so low that even an entry sharing no grams could reach them
/// fall back to verifying the whole dictionary.
pub fn range_search<M: SimilarityMetric>(
    index: &InvertedIndex,
    dictionary: &Dictionary,
    query: &str,
    metric: &M,
    min_score: f64,
) -> Result<Vec<SearchHit>> {
    index.check_dictionary(dictionary)?;

    if min_score <= 0.0 {
        return Ok(verify_all(dictionary, query, metric, min_score));
    }

    let query = Query::range(index.codec(), query, min_score)?;

    // Zero shared grams does not imply a zero score; "ab" and "ba"
    // share no padded bigram yet sit two edits apart. Only a cutoff
    // strictly above the zero-overlap bound lets the merge prune.
    if metric.overlap_bound(query.profile(), 0) >= min_score {
        debug!(min_score, "cutoff below zero-overlap bound, scanning");
        return Ok(verify_all(dictionary, query.text(), metric, min_score));
    }

    // One slice per gram occurrence; the merger collapses repeats back
    // into weights by allocation identity.
    let mut expanded: Vec<&[u32]> = Vec::new();
    for &(gram, mult) in query.unique_grams() {
        let list = index.list(gram);
        if list.is_empty() {
            continue;
        }
        for _ in 0..mult {
            expanded.push(list);
        }
    }
    if expanded.is_empty() {
        return Ok(Vec::new());
    }

    // Smallest overlap whose bound still reaches the cutoff. Overlap
    // beyond the reachable gram occurrences means no indexed entry can
    // qualify.
    let reachable = expanded.len();
    let threshold = match (1..=reachable)
        .find(|&c| metric.overlap_bound(query.profile(), c) >= min_score)
    {
        Some(t) => t,
        None => return Ok(Vec::new()),
    };
    debug!(threshold, lists = reachable, min_score, "range search");

    let candidates = DivideSkipMerger::default().merge_weighted(&expanded, threshold);
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|id| {
            let entry = dictionary.get(id)?;
            let score = metric.score(query.text(), entry);
            (score >= min_score).then_some(SearchHit { id, score })
        })
        .collect();
    hits.sort_by_key(|h| (Reverse(OrderedFloat(h.score)), h.id));
    Ok(hits)
}

fn verify_all<M: SimilarityMetric>(
    dictionary: &Dictionary,
    query: &str,
    metric: &M,
    min_score: f64,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = dictionary
        .iter()
        .map(|(id, entry)| SearchHit {
            id,
            score: metric.score(query, entry),
        })
        .filter(|hit| hit.score >= min_score)
        .collect();
    hits.sort_by_key(|h| (Reverse(OrderedFloat(h.score)), h.id));
    hits
}

/// Ids within `max_edits` edits of the query, ascending
///
/// An edit rewrites at most `gram_length` padded grams, so a match
/// still shares `total_grams - max_edits * gram_length` of the query's
/// gram occurrences. When that filter drops to zero or below it prunes
/// nothing and every entry is verified directly.
pub fn within_edit_distance(
    index: &InvertedIndex,
    dictionary: &Dictionary,
    query: &str,
    max_edits: usize,
) -> Result<Vec<StringId>> {
    index.check_dictionary(dictionary)?;

    let grams = index.codec().decompose(query)?;
    let q = index.codec().gram_length();
    let filter = grams.len() as i64 - max_edits as i64 * q as i64;
    if filter <= 0 {
        debug!(max_edits, "count filter degenerate, scanning");
        return Ok(dictionary
            .iter()
            .filter(|&(_, entry)| levenshtein_distance(query, entry) <= max_edits)
            .map(|(id, _)| id)
            .collect());
    }
    let threshold = filter as usize;

    let mut expanded: Vec<&[u32]> = Vec::new();
    for &gram in &grams {
        let list = index.list(gram);
        if !list.is_empty() {
            expanded.push(list);
        }
    }

    let candidates = DivideSkipMerger::default().merge_weighted(&expanded, threshold);
    Ok(candidates
        .into_iter()
        .filter(|&id| match dictionary.get(id) {
            Some(entry) => levenshtein_distance(query, entry) <= max_edits,
            None => false,
        })
        .collect())
}
