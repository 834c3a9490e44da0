use serde::{Deserialize, Serialize};

use crate::error::{GramdexError, Result};

/// How gram substrings are mapped to stable `u32` identifiers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GramIdScheme {
    /// Positional base-N encoding over a fixed alphabet plus the two
    /// padding symbols. Collision-free, but every indexed character must
    /// belong to the alphabet.
    BaseN { alphabet: String },
    /// Stable hash of the gram characters, truncated to 32 bits. Works
    /// for arbitrary text; a rare collision merges two grams' postings,
    /// which only widens candidate sets before verification.
    Hashed,
}

/// Gram decomposition and index construction settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GramConfig {
    /// Gram width q; a string of n chars produces exactly n + q - 1 grams
    pub gram_length: usize,
    /// Character conceptually prepended q - 1 times before decomposition
    pub pad_start: char,
    /// Character conceptually appended q - 1 times before decomposition
    pub pad_end: char,
    pub id_scheme: GramIdScheme,
    /// Physically share postings lists with identical contents after build
    pub coalesce_duplicate_lists: bool,
}

impl Default for GramConfig {
    fn default() -> Self {
        Self {
            gram_length: 3,
            pad_start: '^',
            pad_end: '$',
            id_scheme: GramIdScheme::BaseN {
                alphabet: "abcdefghijklmnopqrstuvwxyz".to_string(),
            },
            coalesce_duplicate_lists: true,
        }
    }
}

impl GramConfig {
    /// Set the gram width
    pub fn with_gram_length(mut self, q: usize) -> Self {
        self.gram_length = q;
        self
    }

    /// Set the boundary padding characters
    pub fn with_padding(mut self, start: char, end: char) -> Self {
        self.pad_start = start;
        self.pad_end = end;
        self
    }

    /// Set the gram id scheme
    pub fn with_id_scheme(mut self, scheme: GramIdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    /// Enable or disable the duplicate-list coalescing pass
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_duplicate_lists = enabled;
        self
    }

    /// Validate the configuration
    ///
    /// Checks that the gram width is usable and, for base-N ids, that the
    /// alphabet plus both padding symbols fits a 32-bit positional code.
    pub fn validate(&self) -> Result<()> {
        if self.gram_length == 0 {
            return Err(GramdexError::InvalidGramLength(0));
        }

        if let GramIdScheme::BaseN { alphabet } = &self.id_scheme {
            let mut seen = std::collections::HashSet::new();
            for c in alphabet.chars() {
                if c == self.pad_start || c == self.pad_end {
                    return Err(GramdexError::PaddingInAlphabet(c));
                }
                if !seen.insert(c) {
                    return Err(GramdexError::DuplicateAlphabetSymbol(c));
                }
            }

            // Base is alphabet plus the two padding symbols; every q-digit
            // code must fit in u32. The smallest base is 2, so any q
            // past 32 overflows regardless of alphabet.
            if self.gram_length > 32 {
                return Err(GramdexError::AlphabetOverflow {
                    alphabet: seen.len(),
                    q: self.gram_length,
                });
            }
            let base = seen.len() as u64 + 2;
            match base.checked_pow(self.gram_length as u32) {
                Some(codes) if codes <= u32::MAX as u64 + 1 => {}
                _ => {
                    return Err(GramdexError::AlphabetOverflow {
                        alphabet: seen.len(),
                        q: self.gram_length,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Tuning for the DivideSkip list merger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Fraction governing how many of the longest lists are probed
    /// instead of merged: the long-list budget is
    /// floor(threshold / (mu * log2(longest_list_len) + 1)).
    pub mu: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { mu: 0.01 }
    }
}

impl MergeConfig {
    /// Set the long-list split fraction
    pub fn with_mu(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }
}

/// Tuning for top-k searches
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopKConfig {
    /// How many scored candidates to admit between threshold re-checks.
    /// Smaller values tighten pruning sooner at the cost of more bound
    /// computations.
    pub recheck_interval: usize,
    /// Minimum weight-adjusted score a hit must reach to be returned.
    /// Also seeds the overlap pruning bound before the result heap
    /// fills, so high floors cut the merge short early.
    pub score_floor: Option<f64>,
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self {
            recheck_interval: 16,
            score_floor: None,
        }
    }
}

impl TopKConfig {
    /// Set the candidate batch size between threshold re-checks
    pub fn with_recheck_interval(mut self, interval: usize) -> Self {
        self.recheck_interval = interval.max(1);
        self
    }

    /// Require a minimum weight-adjusted score for returned hits
    pub fn with_score_floor(mut self, floor: f64) -> Self {
        self.score_floor = Some(floor);
        self
    }
}
