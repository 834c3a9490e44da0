//! Dictionary of searchable strings with ranking weights
//!
//! String ids are positions in the dictionary, which is what the
//! inverted index stores in its postings lists. The dictionary also
//! carries per-entry weights used to bias top-k ranking, plus a
//! precomputed suffix-maximum over those weights that lets a top-k
//! search bound the best score any not-yet-seen id could reach.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GramdexError, Result};

/// Position of a string in the dictionary
pub type StringId = u32;

/// Serialized form: entries and weights only, derived tables are rebuilt
#[derive(Serialize, Deserialize)]
struct DictionaryFile {
    entries: Vec<String>,
    weights: Vec<f64>,
}

/// Immutable collection of searchable strings and their weights
#[derive(Clone, Debug)]
pub struct Dictionary {
    entries: Vec<String>,
    weights: Vec<f64>,
    /// suffix_max_weight[i] = max of weights[i..]
    suffix_max_weight: Vec<f64>,
}

impl Dictionary {
    /// Create a dictionary with uniform weight 1.0
    pub fn new(entries: Vec<String>) -> Result<Self> {
        let weights = vec![1.0; entries.len()];
        Self::with_weights(entries, weights)
    }

    /// Create a dictionary with explicit per-entry weights
    ///
    /// Weights must be finite and non-negative; there must be exactly one
    /// per entry.
    pub fn with_weights(entries: Vec<String>, weights: Vec<f64>) -> Result<Self> {
        if entries.len() != weights.len() {
            return Err(GramdexError::WeightCountMismatch {
                entries: entries.len(),
                weights: weights.len(),
            });
        }
        // The top string id must stay below the merge frontier sentinel.
        if entries.len() > u32::MAX as usize {
            return Err(GramdexError::DictionaryTooLarge(entries.len()));
        }
        for &w in &weights {
            if !w.is_finite() || w < 0.0 {
                return Err(GramdexError::InvalidWeight(w));
            }
        }

        let suffix_max_weight = build_suffix_max(&weights);
        Ok(Self {
            entries,
            weights,
            suffix_max_weight,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry text for a string id
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.entries.get(id as usize).map(String::as_str)
    }

    /// Ranking weight for a string id
    pub fn weight(&self, id: StringId) -> f64 {
        debug_assert!((id as usize) < self.weights.len());
        self.weights.get(id as usize).copied().unwrap_or(0.0)
    }

    /// Largest weight among ids >= `from`; 0.0 once past the end
    pub fn max_weight_from(&self, from: StringId) -> f64 {
        self.suffix_max_weight
            .get(from as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Largest weight in the whole dictionary
    pub fn max_weight(&self) -> f64 {
        self.max_weight_from(0)
    }

    /// Iterate entries in id order
    pub fn iter(&self) -> impl Iterator<Item = (StringId, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(id, s)| (id as StringId, s.as_str()))
    }

    /// Serialize entries and weights to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let payload = DictionaryFile {
            entries: self.entries.clone(),
            weights: self.weights.clone(),
        };
        bincode::serialize_into(BufWriter::new(file), &payload)?;
        Ok(())
    }

    /// Load a dictionary saved with [`Dictionary::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let payload: DictionaryFile = bincode::deserialize_from(BufReader::new(file))?;
        Self::with_weights(payload.entries, payload.weights)
    }
}

fn build_suffix_max(weights: &[f64]) -> Vec<f64> {
    let mut suffix = vec![0.0; weights.len()];
    let mut best = 0.0f64;
    for (i, &w) in weights.iter().enumerate().rev() {
        best = best.max(w);
        suffix[i] = best;
    }
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_weights() {
        let dict = Dictionary::new(vec!["cat".to_string(), "cart".to_string()]).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(0), Some("cat"));
        assert_eq!(dict.get(2), None);
        assert_eq!(dict.weight(1), 1.0);
        assert_eq!(dict.max_weight(), 1.0);
    }

    #[test]
    fn test_weight_count_mismatch() {
        let result = Dictionary::with_weights(vec!["a".to_string()], vec![1.0, 2.0]);
        assert!(matches!(
            result,
            Err(GramdexError::WeightCountMismatch {
                entries: 1,
                weights: 2
            })
        ));
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let result = Dictionary::with_weights(vec!["a".to_string()], vec![f64::NAN]);
        assert!(matches!(result, Err(GramdexError::InvalidWeight(_))));

        let result = Dictionary::with_weights(vec!["a".to_string()], vec![-0.5]);
        assert!(matches!(result, Err(GramdexError::InvalidWeight(_))));
    }

    #[test]
    fn test_suffix_max_weight() {
        let dict = Dictionary::with_weights(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![0.1, 0.5, 0.2],
        )
        .unwrap();

        assert_eq!(dict.max_weight_from(0), 0.5);
        assert_eq!(dict.max_weight_from(1), 0.5);
        assert_eq!(dict.max_weight_from(2), 0.2);
        assert_eq!(dict.max_weight_from(3), 0.0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.bin");

        let dict = Dictionary::with_weights(
            vec!["ab".to_string(), "abc".to_string(), "bc".to_string()],
            vec![0.1, 0.2, 0.3],
        )
        .unwrap();
        dict.save(&path).unwrap();

        let loaded = Dictionary::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(1), Some("abc"));
        assert_eq!(loaded.weight(2), 0.3);
        assert_eq!(loaded.max_weight_from(1), 0.3);
    }
}
