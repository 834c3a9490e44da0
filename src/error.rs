use thiserror::Error;

/// Main error type for gramdex operations
#[derive(Error, Debug)]
pub enum GramdexError {
    #[error("Invalid gram length: {0} (must be at least 1)")]
    InvalidGramLength(usize),

    #[error("Alphabet of {alphabet} symbols cannot encode grams of length {q} in 32 bits")]
    AlphabetOverflow { alphabet: usize, q: usize },

    #[error("Padding character {0:?} must not appear in the alphabet")]
    PaddingInAlphabet(char),

    #[error("Alphabet lists symbol {0:?} more than once")]
    DuplicateAlphabetSymbol(char),

    #[error("Character {0:?} is outside the configured alphabet")]
    SymbolOutsideAlphabet(char),

    #[error("Dictionary has {0} entries, exceeding the maximum string id")]
    DictionaryTooLarge(usize),

    #[error("Dictionary has {entries} entries but {weights} weights")]
    WeightCountMismatch { entries: usize, weights: usize },

    #[error("Weight {0} is not a finite non-negative number")]
    InvalidWeight(f64),

    #[error("Dictionary size mismatch: index was built over {expected} entries, got {actual}")]
    DictionaryMismatch { expected: u64, actual: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),
}

/// Result type alias for gramdex operations
pub type Result<T> = std::result::Result<T, GramdexError>;

impl GramdexError {
    /// Check if this error was caused by an unreadable or malformed index file
    pub fn is_corrupt_index(&self) -> bool {
        matches!(self, GramdexError::CorruptIndex(_))
    }

    /// Check if this error reflects an invalid configuration rather than bad data
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            GramdexError::InvalidGramLength(_)
                | GramdexError::AlphabetOverflow { .. }
                | GramdexError::PaddingInAlphabet(_)
                | GramdexError::DuplicateAlphabetSymbol(_)
        )
    }
}
