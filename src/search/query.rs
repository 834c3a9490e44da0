use std::collections::HashMap;

use crate::error::Result;
use crate::gram::{GramCodec, GramId};

use super::metric::QueryProfile;

/// What a query asks for
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryKind {
    /// Every id whose similarity reaches the floor
    Range { min_score: f64 },
    /// The k best ids by weight-adjusted similarity
    TopK { k: usize },
}

/// A query with its decomposition captured once
///
/// Holds the text, the gram ids in window order, the distinct ids with
/// their multiplicities, and the profile the metric bounds work from.
/// Immutable after construction; the same query can be run repeatedly.
#[derive(Clone, Debug)]
pub struct Query {
    text: String,
    grams: Vec<GramId>,
    unique: Vec<(GramId, usize)>,
    profile: QueryProfile,
    kind: QueryKind,
}

impl Query {
    fn build(codec: &GramCodec, text: &str, kind: QueryKind) -> Result<Self> {
        let grams = codec.decompose(text)?;

        let mut multiplicity: HashMap<GramId, usize> = HashMap::new();
        for &gram in &grams {
            *multiplicity.entry(gram).or_insert(0) += 1;
        }
        let mut unique: Vec<(GramId, usize)> = multiplicity.into_iter().collect();
        unique.sort_unstable_by_key(|&(gram, _)| gram);

        let profile = QueryProfile {
            chars: text.chars().count(),
            gram_length: codec.gram_length(),
            total_grams: grams.len(),
            unique_grams: unique.len(),
        };

        Ok(Self {
            text: text.to_string(),
            grams,
            unique,
            profile,
            kind,
        })
    }

    /// Prepare a range query
    pub fn range(codec: &GramCodec, text: &str, min_score: f64) -> Result<Self> {
        Self::build(codec, text, QueryKind::Range { min_score })
    }

    /// Prepare a top-k query
    pub fn top_k(codec: &GramCodec, text: &str, k: usize) -> Result<Self> {
        Self::build(codec, text, QueryKind::TopK { k })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Gram ids in window order, duplicates included
    pub fn grams(&self) -> &[GramId] {
        &self.grams
    }

    /// Distinct gram ids with their multiplicities, ascending by id
    pub fn unique_grams(&self) -> &[(GramId, usize)] {
        &self.unique
    }

    pub fn profile(&self) -> &QueryProfile {
        &self.profile
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GramConfig;

    fn codec() -> GramCodec {
        GramCodec::new(&GramConfig::default().with_gram_length(2)).unwrap()
    }

    #[test]
    fn test_query_snapshot() {
        let codec = codec();
        let query = Query::top_k(&codec, "abc", 3).unwrap();

        assert_eq!(query.text(), "abc");
        assert_eq!(query.grams().len(), 4);
        assert_eq!(query.unique_grams().len(), 4);
        assert_eq!(query.profile().total_grams, 4);
        assert_eq!(query.profile().chars, 3);
        assert_eq!(query.kind(), QueryKind::TopK { k: 3 });
    }

    #[test]
    fn test_repeated_grams_collapse() {
        let codec = codec();
        // "aaa" decomposes to ^a, aa, aa, a$.
        let query = Query::range(&codec, "aaa", 0.5).unwrap();

        assert_eq!(query.grams().len(), 4);
        assert_eq!(query.unique_grams().len(), 3);

        let total: usize = query.unique_grams().iter().map(|&(_, m)| m).sum();
        assert_eq!(total, 4);

        let doubled = query.unique_grams().iter().filter(|&&(_, m)| m == 2).count();
        assert_eq!(doubled, 1);
    }

    #[test]
    fn test_unique_grams_sorted() {
        let codec = codec();
        let query = Query::top_k(&codec, "carthorse", 1).unwrap();
        let ids: Vec<u32> = query.unique_grams().iter().map(|&(g, _)| g).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
