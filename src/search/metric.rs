//! Similarity metrics and their gram-overlap score bounds
//!
//! Each metric scores a pair of strings in [0, 1] and, separately,
//! bounds the score any string can reach given how much gram weight it
//! shares with a query. The bounds are what turn a similarity floor
//! into a merge threshold: they must never underestimate, and more
//! shared weight must never lower them.

use std::collections::HashSet;

use crate::config::GramConfig;

/// Shape of a query's decomposition, as the bounds need it
#[derive(Clone, Copy, Debug)]
pub struct QueryProfile {
    /// Characters in the query text
    pub chars: usize,
    /// Gram width q
    pub gram_length: usize,
    /// Total grams, duplicates included (chars + q - 1)
    pub total_grams: usize,
    /// Distinct gram ids
    pub unique_grams: usize,
}

/// Scores string pairs and bounds scores from gram overlap
pub trait SimilarityMetric {
    /// Similarity of two strings in [0, 1]; 1.0 means identical
    fn score(&self, a: &str, b: &str) -> f64;

    /// Upper bound on the score of any string sharing at most `overlap`
    /// gram weight with the profiled query
    ///
    /// Admissible (never below the true score of such a string) and
    /// non-decreasing in `overlap`; threshold derivation in the top-k
    /// and range searches relies on both properties.
    fn overlap_bound(&self, profile: &QueryProfile, overlap: usize) -> f64;
}

/// Fewest edits any string sharing `overlap` grams can be away
///
/// A single edit destroys at most q grams, so sharing only `overlap` of
/// `total_grams` forces at least ceil((total - overlap) / q) edits.
fn min_edits(profile: &QueryProfile, overlap: usize) -> usize {
    if overlap >= profile.total_grams {
        return 0;
    }
    let missing = profile.total_grams - overlap;
    (missing + profile.gram_length - 1) / profile.gram_length
}

/// Reciprocal edit distance: 1 / (1 + levenshtein)
#[derive(Clone, Copy, Debug, Default)]
pub struct EditDistanceSimilarity;

impl SimilarityMetric for EditDistanceSimilarity {
    fn score(&self, a: &str, b: &str) -> f64 {
        1.0 / (1.0 + levenshtein_distance(a, b) as f64)
    }

    fn overlap_bound(&self, profile: &QueryProfile, overlap: usize) -> f64 {
        1.0 / (1.0 + min_edits(profile, overlap) as f64)
    }
}

/// Edit distance normalized by the longer string: 1 - d / max(|a|, |b|)
#[derive(Clone, Copy, Debug, Default)]
pub struct NormalizedEditDistance;

impl SimilarityMetric for NormalizedEditDistance {
    fn score(&self, a: &str, b: &str) -> f64 {
        let len_a = a.chars().count();
        let len_b = b.chars().count();
        let longest = len_a.max(len_b);
        if longest == 0 {
            return 1.0;
        }
        1.0 - levenshtein_distance(a, b) as f64 / longest as f64
    }

    fn overlap_bound(&self, profile: &QueryProfile, overlap: usize) -> f64 {
        let edits = min_edits(profile, overlap);
        if edits == 0 {
            return 1.0;
        }
        // At distance d the longer string has at most chars + d
        // characters, and 1 - d / (chars + d) shrinks as d grows, so the
        // minimum distance gives the largest reachable score.
        1.0 - edits as f64 / (profile.chars + edits) as f64
    }
}

/// Jaccard similarity over the two padded gram sets
#[derive(Clone, Debug)]
pub struct GramJaccard {
    gram_length: usize,
    pad_start: char,
    pad_end: char,
}

impl GramJaccard {
    pub fn new(gram_length: usize, pad_start: char, pad_end: char) -> Self {
        Self {
            gram_length,
            pad_start,
            pad_end,
        }
    }

    /// Build with the same decomposition parameters as a gram config
    pub fn from_config(config: &GramConfig) -> Self {
        Self::new(config.gram_length, config.pad_start, config.pad_end)
    }

    fn gram_set(&self, text: &str) -> HashSet<Vec<char>> {
        let q = self.gram_length;
        let mut padded: Vec<char> = Vec::with_capacity(text.len() + 2 * (q - 1));
        padded.extend(std::iter::repeat(self.pad_start).take(q - 1));
        padded.extend(text.chars());
        padded.extend(std::iter::repeat(self.pad_end).take(q - 1));
        padded.windows(q).map(|w| w.to_vec()).collect()
    }
}

impl SimilarityMetric for GramJaccard {
    fn score(&self, a: &str, b: &str) -> f64 {
        let set_a = self.gram_set(a);
        let set_b = self.gram_set(b);
        let shared = set_a.intersection(&set_b).count();
        let union = set_a.len() + set_b.len() - shared;
        if union == 0 {
            return 1.0;
        }
        shared as f64 / union as f64
    }

    fn overlap_bound(&self, profile: &QueryProfile, overlap: usize) -> f64 {
        let unique = profile.unique_grams;
        if unique == 0 {
            return 1.0;
        }
        // The union is at least the query's own gram set; the shared set
        // is at most the matched weight and at most the whole set.
        overlap.min(unique) as f64 / unique as f64
    }
}

/// Levenshtein distance between two strings
///
/// Two-row dynamic programming: O(len_a * len_b) time, O(min) space.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Keep the shorter string on the row to minimize space.
    let (shorter, longer) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    let mut prev_row: Vec<usize> = (0..=shorter.len()).collect();
    let mut curr_row = vec![0usize; shorter.len() + 1];

    for (i, &lc) in longer.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, &sc) in shorter.iter().enumerate() {
            let cost = if lc == sc { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[shorter.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gram::GramCodec;

    fn profile_for(text: &str, config: &GramConfig) -> QueryProfile {
        let codec = GramCodec::new(config).unwrap();
        let grams = codec.decompose(text).unwrap();
        let unique: HashSet<u32> = grams.iter().copied().collect();
        QueryProfile {
            chars: text.chars().count(),
            gram_length: config.gram_length,
            total_grams: grams.len(),
            unique_grams: unique.len(),
        }
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("rust", "rust"), 0);
        assert_eq!(levenshtein_distance("rust", "just"), 1);
        assert_eq!(levenshtein_distance("rust", "rusts"), 1);
        assert_eq!(levenshtein_distance("rusts", "rust"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("saturday", "sunday"), 3);
        assert_eq!(levenshtein_distance("", "test"), 4);
        assert_eq!(levenshtein_distance("test", ""), 4);
        assert_eq!(levenshtein_distance("", ""), 0);
    }

    #[test]
    fn test_edit_distance_scores() {
        let metric = EditDistanceSimilarity;
        assert_eq!(metric.score("cat", "cat"), 1.0);
        assert_eq!(metric.score("cat", "cart"), 0.5);
        assert!(metric.score("cat", "dog") < metric.score("cat", "cart"));
    }

    #[test]
    fn test_normalized_edit_distance_scores() {
        let metric = NormalizedEditDistance;
        assert_eq!(metric.score("cat", "cat"), 1.0);
        // One edit over the longer length 4.
        assert_eq!(metric.score("cat", "cart"), 0.75);
        assert_eq!(metric.score("", ""), 1.0);
        assert_eq!(metric.score("", "ab"), 0.0);
    }

    #[test]
    fn test_gram_jaccard_scores() {
        let metric = GramJaccard::new(2, '^', '$');
        assert_eq!(metric.score("cat", "cat"), 1.0);
        assert_eq!(metric.score("ab", "xy"), 0.0);

        // "ab" -> {^a, ab, b$}, "abc" -> {^a, ab, bc, c$}: 2 shared of 5.
        assert_eq!(metric.score("ab", "abc"), 0.4);
    }

    #[test]
    fn test_bounds_are_monotone() {
        let config = GramConfig::default().with_gram_length(2);
        let profile = profile_for("carthorse", &config);

        let edit = EditDistanceSimilarity;
        let ned = NormalizedEditDistance;
        let jac = GramJaccard::from_config(&config);

        for overlap in 1..=profile.total_grams {
            let below = overlap - 1;
            assert!(edit.overlap_bound(&profile, below) <= edit.overlap_bound(&profile, overlap));
            assert!(ned.overlap_bound(&profile, below) <= ned.overlap_bound(&profile, overlap));
            assert!(jac.overlap_bound(&profile, below) <= jac.overlap_bound(&profile, overlap));
        }

        // Full overlap must allow a perfect score.
        assert_eq!(edit.overlap_bound(&profile, profile.total_grams), 1.0);
        assert_eq!(ned.overlap_bound(&profile, profile.total_grams), 1.0);
        assert_eq!(jac.overlap_bound(&profile, profile.total_grams), 1.0);
    }

    #[test]
    fn test_bounds_are_admissible() {
        // For every dictionary word, the bound at its actual overlap
        // must not undercut its actual score.
        let config = GramConfig::default().with_gram_length(2);
        let codec = GramCodec::new(&config).unwrap();
        let query = "cart";
        let profile = profile_for(query, &config);
        let query_grams = codec.decompose(query).unwrap();

        let edit = EditDistanceSimilarity;
        let ned = NormalizedEditDistance;
        let jac = GramJaccard::from_config(&config);

        for word in ["cart", "cat", "care", "art", "chart", "horse", "ca"] {
            let word_grams = codec.decompose(word).unwrap();
            let mut remaining = word_grams.clone();
            let overlap = query_grams
                .iter()
                .filter(|g| {
                    if let Some(at) = remaining.iter().position(|w| w == *g) {
                        remaining.swap_remove(at);
                        true
                    } else {
                        false
                    }
                })
                .count();

            for (name, score, bound) in [
                ("edit", edit.score(query, word), edit.overlap_bound(&profile, overlap)),
                ("ned", ned.score(query, word), ned.overlap_bound(&profile, overlap)),
                ("jaccard", jac.score(query, word), jac.overlap_bound(&profile, overlap)),
            ] {
                assert!(
                    score <= bound + 1e-12,
                    "{} bound {} under score {} for {:?}",
                    name,
                    bound,
                    score,
                    word
                );
            }
        }
    }

    #[test]
    fn test_min_edits_matches_count_filter() {
        let config = GramConfig::default().with_gram_length(3);
        let profile = profile_for("cat", &config);
        assert_eq!(profile.total_grams, 5);

        // Sharing everything needs no edits; each missing block of q
        // grams forces one more.
        assert_eq!(min_edits(&profile, 5), 0);
        assert_eq!(min_edits(&profile, 4), 1);
        assert_eq!(min_edits(&profile, 2), 1);
        assert_eq!(min_edits(&profile, 1), 2);
        assert_eq!(min_edits(&profile, 0), 2);
    }
}
