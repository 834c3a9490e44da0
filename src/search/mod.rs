//! Similarity search over the inverted index
//!
//! Queries are decomposed with the index's codec, candidate ids come
//! from threshold merges over the gram postings, and a similarity
//! metric verifies and ranks them. Pruning thresholds are derived from
//! each metric's admissible overlap bound, so results are exact for the
//! metric, never approximations.

mod metric;
mod query;
mod range;
mod topk;

pub use metric::*;
pub use query::*;
pub use range::*;
pub use topk::*;

use crate::dictionary::{Dictionary, StringId};
use crate::error::Result;
use crate::index::InvertedIndex;

/// A scored search result
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub id: StringId,
    pub score: f64,
}

/// Run a prepared query against an index and its dictionary
pub fn execute<M: SimilarityMetric>(
    index: &InvertedIndex,
    dictionary: &Dictionary,
    metric: &M,
    query: &Query,
) -> Result<Vec<SearchHit>> {
    match query.kind() {
        QueryKind::Range { min_score } => {
            range_search(index, dictionary, query.text(), metric, min_score)
        }
        QueryKind::TopK { k } => top_k_scored(index, dictionary, query.text(), metric, k),
    }
}
