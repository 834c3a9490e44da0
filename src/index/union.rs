//! Physical sharing of identical postings lists
//!
//! Different grams often index exactly the same set of strings (every
//! "xy" occurrence sitting inside "xyz", say). After build, lists with
//! identical contents can share one allocation; duplicate-aware merges
//! then recognize them by pointer and process each distinct list once
//! with a weight. Purely an optimization: query results are unchanged.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::gram::GramId;

use super::types::PostingsList;

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving keeps the walk iterative.
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

fn content_hash(list: &[u32]) -> u64 {
    let mut hasher = DefaultHasher::new();
    list.hash(&mut hasher);
    hasher.finish()
}

/// Make content-identical lists share one allocation
///
/// Returns how many lists now alias another gram's list. Candidate pairs
/// are found by content hash and confirmed by full comparison before
/// they are unioned, so a hash collision cannot conflate distinct lists.
pub(crate) fn coalesce(lists: &mut HashMap<GramId, PostingsList>) -> usize {
    // Sort by gram id so the surviving representative is deterministic.
    let mut grams: Vec<GramId> = lists.keys().copied().collect();
    grams.sort_unstable();

    let arcs: Vec<PostingsList> = grams.iter().map(|g| Arc::clone(&lists[g])).collect();

    let mut buckets: HashMap<(u64, usize), Vec<usize>> = HashMap::new();
    for (pos, list) in arcs.iter().enumerate() {
        buckets
            .entry((content_hash(list), list.len()))
            .or_default()
            .push(pos);
    }

    let mut sets = DisjointSet::new(arcs.len());
    for members in buckets.values() {
        if members.len() < 2 {
            continue;
        }
        // Union against one representative per distinct content.
        let mut reps: Vec<usize> = Vec::new();
        for &pos in members {
            match reps
                .iter()
                .find(|&&rep| arcs[rep].as_ref() == arcs[pos].as_ref())
            {
                Some(&rep) => sets.union(rep, pos),
                None => reps.push(pos),
            }
        }
    }

    let mut shared = 0;
    for pos in 0..arcs.len() {
        let root = sets.find(pos);
        if root != pos {
            lists.insert(grams[pos], Arc::clone(&arcs[root]));
            shared += 1;
        }
    }
    shared
}
