use std::sync::Arc;

use serde::Serialize;

/// A postings list: strictly ascending, duplicate-free string ids
///
/// Lists are reference-counted so the coalescing pass can make grams
/// with identical postings share one allocation; merges then recognize
/// shared lists by pointer and count them once with a weight.
pub type PostingsList = Arc<[u32]>;

/// Summary counters over a built index
#[derive(Clone, Debug, Default, Serialize)]
pub struct IndexStats {
    /// Number of distinct grams with at least one posting
    pub gram_count: usize,
    /// Total postings across all lists
    pub posting_count: u64,
    /// Number of dictionary entries the index was built over
    pub dict_size: u64,
    /// Lists sharing another gram's allocation after coalescing
    pub coalesced_lists: usize,
}
