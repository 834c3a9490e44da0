//! Inverted index from gram ids to postings lists
//!
//! The index is built once over a dictionary snapshot and never mutated
//! afterwards, which is what makes lock-free concurrent reads safe.
//!
//! - `InvertedIndex`: build-once postings map with borrowed list access
//! - binary save/load in a fixed little-endian format
//! - optional coalescing pass that physically shares identical lists

mod inverted;
mod io;
mod types;
mod union;

pub use inverted::*;
pub use types::*;
