//! Build-once inverted index construction and access

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::{GramConfig, GramIdScheme};
use crate::dictionary::Dictionary;
use crate::error::{GramdexError, Result};
use crate::gram::{GramCodec, GramId};

use super::types::{IndexStats, PostingsList};
use super::{io, union};

const EMPTY_LIST: &[u32] = &[];

/// Inverted index from gram ids to the dictionary entries containing them
///
/// Built in one shot over a dictionary snapshot and immutable afterwards;
/// re-indexing means building a new value. All accessors borrow, so a
/// shared index serves concurrent readers without locks.
#[derive(Debug)]
pub struct InvertedIndex {
    codec: GramCodec,
    dict_size: u64,
    lists: HashMap<GramId, PostingsList>,
    posting_count: u64,
    coalesced_lists: usize,
}

impl InvertedIndex {
    /// Build an index over every entry of a dictionary
    ///
    /// Entries are decomposed in id order, so each gram's postings come
    /// out strictly increasing without a sort. A gram repeated inside
    /// one entry still yields a single posting for that entry.
    pub fn build(dictionary: &Dictionary, config: &GramConfig) -> Result<Self> {
        let codec = GramCodec::new(config)?;

        let mut building: HashMap<GramId, Vec<u32>> = HashMap::new();
        for (id, text) in dictionary.iter() {
            for gram in codec.decompose(text)? {
                let list = building.entry(gram).or_default();
                if list.last() != Some(&id) {
                    list.push(id);
                }
            }
        }

        let mut posting_count = 0u64;
        let mut lists: HashMap<GramId, PostingsList> = HashMap::with_capacity(building.len());
        for (gram, ids) in building {
            debug_assert!(
                ids.windows(2).all(|w| w[0] < w[1]),
                "postings for gram {} lost their ordering",
                gram
            );
            posting_count += ids.len() as u64;
            lists.insert(gram, Arc::from(ids));
        }

        let coalesced_lists = if config.coalesce_duplicate_lists {
            union::coalesce(&mut lists)
        } else {
            0
        };

        debug!(
            grams = lists.len(),
            postings = posting_count,
            coalesced = coalesced_lists,
            dict_size = dictionary.len(),
            "built inverted index"
        );

        Ok(Self {
            codec,
            dict_size: dictionary.len() as u64,
            lists,
            posting_count,
            coalesced_lists,
        })
    }

    /// Gram width q the index was built with
    pub fn gram_length(&self) -> usize {
        self.codec.gram_length()
    }

    /// Number of dictionary entries the index was built over
    pub fn dict_size(&self) -> u64 {
        self.dict_size
    }

    /// The codec queries must be decomposed with
    pub fn codec(&self) -> &GramCodec {
        &self.codec
    }

    /// Postings for one gram; unknown grams yield an empty list
    pub fn list(&self, gram: GramId) -> &[u32] {
        self.lists.get(&gram).map_or(EMPTY_LIST, |l| l.as_ref())
    }

    /// Reference-counted handle for one gram's postings, if present
    pub fn shared_list(&self, gram: GramId) -> Option<&PostingsList> {
        self.lists.get(&gram)
    }

    /// Borrowed postings for a batch of grams, in input order
    ///
    /// Absent grams contribute empty slices, which merge as zero-length
    /// lists.
    pub fn lists_for(&self, grams: &[GramId]) -> Vec<&[u32]> {
        grams.iter().map(|&g| self.list(g)).collect()
    }

    /// Summary counters
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            gram_count: self.lists.len(),
            posting_count: self.posting_count,
            dict_size: self.dict_size,
            coalesced_lists: self.coalesced_lists,
        }
    }

    /// Verify a dictionary matches the size this index was built over
    ///
    /// Size is the only cheap invariant available; pairing an index with
    /// a same-sized but different dictionary is not detectable here.
    pub fn check_dictionary(&self, dictionary: &Dictionary) -> Result<()> {
        if dictionary.len() as u64 != self.dict_size {
            return Err(GramdexError::DictionaryMismatch {
                expected: self.dict_size,
                actual: dictionary.len() as u64,
            });
        }
        Ok(())
    }

    /// Serialize to the canonical byte form
    ///
    /// Gram records are emitted in ascending id order, so the same index
    /// always produces the same bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (pad_start, pad_end) = self.codec.padding();
        io::encode(
            self.codec.gram_length() as u32,
            pad_start,
            pad_end,
            self.dict_size,
            &self.lists,
        )
    }

    /// CRC32 over the canonical byte form
    ///
    /// Not part of the file format; used to compare indexes and to check
    /// build idempotence.
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.to_bytes());
        hasher.finalize()
    }

    /// Write the index to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Reconstruct an index from its byte form
    ///
    /// The file carries q, the padding characters, and the dictionary
    /// size, but not the gram id scheme; the caller restates the scheme
    /// the index was built with. Identical lists are re-shared after
    /// parsing so duplicate-aware merges work as they did before the
    /// save.
    pub fn from_bytes(bytes: &[u8], id_scheme: GramIdScheme) -> Result<Self> {
        let raw = io::decode(bytes)?;

        let config = GramConfig {
            gram_length: raw.q as usize,
            pad_start: raw.pad_start,
            pad_end: raw.pad_end,
            id_scheme,
            coalesce_duplicate_lists: true,
        };
        let codec = GramCodec::new(&config)?;

        let mut lists = raw.lists;
        let coalesced_lists = union::coalesce(&mut lists);
        let posting_count = lists.values().map(|l| l.len() as u64).sum();

        debug!(
            grams = lists.len(),
            postings = posting_count,
            "loaded inverted index"
        );

        Ok(Self {
            codec,
            dict_size: raw.dict_size,
            lists,
            posting_count,
            coalesced_lists,
        })
    }

    /// Read an index written by [`InvertedIndex::save`]
    pub fn load(path: &Path, id_scheme: GramIdScheme) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, id_scheme)
    }
}
