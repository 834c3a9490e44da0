//! Binary index format
//!
//! Little-endian, fixed layout:
//!
//! - header: `q: u32`, `pad_start: u32`, `pad_end: u32`, `dict_size: u64`
//! - per present gram: `gram_id: u32`, `list_len: u32`, then `list_len`
//!   ascending string ids as `u32`
//!
//! There is no record count, compression, or checksum field: readers
//! consume records until the buffer ends. Writers emit grams in
//! ascending id order so the same index always serializes to the same
//! bytes. Writers never emit an empty list; readers treat one as
//! corruption, as they do any truncated or out-of-order record.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GramdexError, Result};
use crate::gram::GramId;

use super::types::PostingsList;

/// Parsed index file, before codec reconstruction
#[derive(Debug)]
pub(crate) struct RawIndex {
    pub q: u32,
    pub pad_start: char,
    pub pad_end: char,
    pub dict_size: u64,
    pub lists: HashMap<GramId, PostingsList>,
}

/// Serialize an index to its canonical byte form
pub(crate) fn encode(
    q: u32,
    pad_start: char,
    pad_end: char,
    dict_size: u64,
    lists: &HashMap<GramId, PostingsList>,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&q.to_le_bytes());
    out.extend_from_slice(&(pad_start as u32).to_le_bytes());
    out.extend_from_slice(&(pad_end as u32).to_le_bytes());
    out.extend_from_slice(&dict_size.to_le_bytes());

    let mut grams: Vec<GramId> = lists.keys().copied().collect();
    grams.sort_unstable();

    for gram in grams {
        let list = &lists[&gram];
        out.extend_from_slice(&gram.to_le_bytes());
        out.extend_from_slice(&(list.len() as u32).to_le_bytes());
        for &id in list.iter() {
            out.extend_from_slice(&id.to_le_bytes());
        }
    }

    out
}

fn read_u32(input: &[u8], pos: &mut usize, what: &str) -> Result<u32> {
    if input.len() - *pos < 4 {
        return Err(GramdexError::CorruptIndex(format!("truncated {}", what)));
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&input[*pos..*pos + 4]);
    *pos += 4;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(input: &[u8], pos: &mut usize, what: &str) -> Result<u64> {
    if input.len() - *pos < 8 {
        return Err(GramdexError::CorruptIndex(format!("truncated {}", what)));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&input[*pos..*pos + 8]);
    *pos += 8;
    Ok(u64::from_le_bytes(bytes))
}

fn read_char(input: &[u8], pos: &mut usize, what: &str) -> Result<char> {
    let raw = read_u32(input, pos, what)?;
    char::from_u32(raw)
        .ok_or_else(|| GramdexError::CorruptIndex(format!("{} is not a valid character", what)))
}

/// Parse and validate an index file
///
/// Every structural violation is a typed error; nothing is returned
/// partially parsed.
pub(crate) fn decode(input: &[u8]) -> Result<RawIndex> {
    let mut pos = 0usize;

    let q = read_u32(input, &mut pos, "header")?;
    if q == 0 {
        return Err(GramdexError::CorruptIndex(
            "gram length in header is zero".to_string(),
        ));
    }
    let pad_start = read_char(input, &mut pos, "start padding")?;
    let pad_end = read_char(input, &mut pos, "end padding")?;
    let dict_size = read_u64(input, &mut pos, "header")?;

    let mut lists: HashMap<GramId, PostingsList> = HashMap::new();
    while pos < input.len() {
        let gram = read_u32(input, &mut pos, "gram id")?;
        let len = read_u32(input, &mut pos, "list length")? as usize;
        if len == 0 {
            return Err(GramdexError::CorruptIndex(format!(
                "gram {} has an empty postings list",
                gram
            )));
        }
        if (input.len() - pos) / 4 < len {
            return Err(GramdexError::CorruptIndex(format!(
                "truncated postings list for gram {}",
                gram
            )));
        }

        let mut ids = Vec::with_capacity(len);
        let mut prev: Option<u32> = None;
        for _ in 0..len {
            let id = read_u32(input, &mut pos, "string id")?;
            if let Some(p) = prev {
                if id <= p {
                    return Err(GramdexError::CorruptIndex(format!(
                        "postings list for gram {} is not strictly increasing",
                        gram
                    )));
                }
            }
            if id as u64 >= dict_size {
                return Err(GramdexError::CorruptIndex(format!(
                    "string id {} is outside the dictionary of {} entries",
                    id, dict_size
                )));
            }
            prev = Some(id);
            ids.push(id);
        }

        if lists.insert(gram, Arc::from(ids)).is_some() {
            return Err(GramdexError::CorruptIndex(format!(
                "gram {} appears twice",
                gram
            )));
        }
    }

    Ok(RawIndex {
        q,
        pad_start,
        pad_end,
        dict_size,
        lists,
    })
}
