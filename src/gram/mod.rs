//! Q-gram decomposition
//!
//! Turns strings into the fixed-width substring ids the inverted index
//! is keyed by. Strings are conceptually padded with boundary characters
//! so prefixes and suffixes weigh as much as interior substrings.

mod codec;

pub use codec::*;
