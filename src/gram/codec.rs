use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::config::{GramConfig, GramIdScheme};
use crate::error::{GramdexError, Result};

/// Stable identifier of a gram substring; equal substrings map to equal ids
pub type GramId = u32;

#[derive(Debug)]
enum IdScheme {
    BaseN { codes: HashMap<char, u32>, base: u32 },
    Hashed,
}

/// Decomposes strings into padded q-gram ids
///
/// A string of n characters yields exactly n + q - 1 grams: q - 1 copies
/// of the start padding character are conceptually prepended and q - 1
/// copies of the end padding character appended, then every window of
/// width q becomes one gram. Repeated substrings repeat their id.
#[derive(Debug)]
pub struct GramCodec {
    gram_length: usize,
    pad_start: char,
    pad_end: char,
    scheme: IdScheme,
}

impl GramCodec {
    /// Create a codec from a validated configuration
    pub fn new(config: &GramConfig) -> Result<Self> {
        config.validate()?;

        let scheme = match &config.id_scheme {
            GramIdScheme::BaseN { alphabet } => {
                let mut codes = HashMap::new();
                codes.insert(config.pad_start, 0);
                codes.insert(config.pad_end, 1);
                for (i, c) in alphabet.chars().enumerate() {
                    codes.insert(c, i as u32 + 2);
                }
                let base = codes.len() as u32;
                IdScheme::BaseN { codes, base }
            }
            GramIdScheme::Hashed => IdScheme::Hashed,
        };

        Ok(Self {
            gram_length: config.gram_length,
            pad_start: config.pad_start,
            pad_end: config.pad_end,
            scheme,
        })
    }

    /// Gram width q
    pub fn gram_length(&self) -> usize {
        self.gram_length
    }

    /// Padding characters as (start, end)
    pub fn padding(&self) -> (char, char) {
        (self.pad_start, self.pad_end)
    }

    /// Number of grams a string of `chars` characters decomposes into
    pub fn gram_count(&self, chars: usize) -> usize {
        chars + self.gram_length - 1
    }

    /// Decompose a string into its gram ids, in window order
    ///
    /// Works for strings shorter than q (the windows are then mostly
    /// padding). With base-N ids, a character outside the configured
    /// alphabet is an error; with hashed ids any text is accepted.
    pub fn decompose(&self, text: &str) -> Result<Vec<GramId>> {
        let q = self.gram_length;
        let mut padded: Vec<char> = Vec::with_capacity(text.len() + 2 * (q - 1));
        padded.extend(std::iter::repeat(self.pad_start).take(q - 1));
        padded.extend(text.chars());
        padded.extend(std::iter::repeat(self.pad_end).take(q - 1));

        padded.windows(q).map(|w| self.gram_id(w)).collect()
    }

    fn gram_id(&self, gram: &[char]) -> Result<GramId> {
        match &self.scheme {
            IdScheme::BaseN { codes, base } => {
                let mut id: u32 = 0;
                for &c in gram {
                    let code = codes
                        .get(&c)
                        .copied()
                        .ok_or(GramdexError::SymbolOutsideAlphabet(c))?;
                    id = id * base + code;
                }
                Ok(id)
            }
            IdScheme::Hashed => {
                let mut hasher = DefaultHasher::new();
                gram.hash(&mut hasher);
                Ok(hasher.finish() as u32)
            }
        }
    }
}
