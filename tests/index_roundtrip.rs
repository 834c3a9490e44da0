//! Persistence round-trips and corruption handling
//!
//! The binary format carries no checksum of its own, so the checksum
//! method over the canonical encoding is what callers pair with the
//! file; these tests pin that the encoding is deterministic and that
//! damaged files are rejected instead of mis-read.

use tempfile::TempDir;

use gramdex::config::{GramConfig, GramIdScheme};
use gramdex::{Dictionary, InvertedIndex};

fn fixture_dictionary() -> Dictionary {
    Dictionary::new(
        ["ab", "abc", "xab", "axbc", "bc"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
    .unwrap()
}

#[test]
fn save_load_preserves_postings() {
    let dictionary = fixture_dictionary();
    let config = GramConfig::default().with_gram_length(2);
    let index = InvertedIndex::build(&dictionary, &config).unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("grams.idx");
    index.save(&path).unwrap();

    let loaded = InvertedIndex::load(&path, config.id_scheme.clone()).unwrap();

    assert_eq!(loaded.to_bytes(), index.to_bytes());
    assert_eq!(loaded.checksum(), index.checksum());
    assert_eq!(loaded.gram_length(), 2);
    assert_eq!(loaded.dict_size(), dictionary.len() as u64);

    for word in ["abc", "xab", "bc"] {
        let grams = index.codec().decompose(word).unwrap();
        for gram in grams {
            assert_eq!(loaded.list(gram), index.list(gram));
        }
    }
}

#[test]
fn rebuild_is_byte_identical() {
    let dictionary = fixture_dictionary();
    let config = GramConfig::default().with_gram_length(2);

    let a = InvertedIndex::build(&dictionary, &config).unwrap();
    let b = InvertedIndex::build(&dictionary, &config).unwrap();

    assert_eq!(a.to_bytes(), b.to_bytes());
    assert_eq!(a.checksum(), b.checksum());
}

#[test]
fn hashed_scheme_round_trips() {
    let dictionary = Dictionary::new(
        ["naïve", "café", "crème"].iter().map(|s| s.to_string()).collect(),
    )
    .unwrap();
    let config = GramConfig::default()
        .with_gram_length(2)
        .with_id_scheme(GramIdScheme::Hashed);
    let index = InvertedIndex::build(&dictionary, &config).unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("hashed.idx");
    index.save(&path).unwrap();

    let loaded = InvertedIndex::load(&path, GramIdScheme::Hashed).unwrap();
    assert_eq!(loaded.to_bytes(), index.to_bytes());

    for gram in loaded.codec().decompose("café").unwrap() {
        assert_eq!(loaded.list(gram), index.list(gram));
    }
}

#[test]
fn truncated_file_is_rejected() {
    let dictionary = fixture_dictionary();
    let config = GramConfig::default().with_gram_length(2);
    let index = InvertedIndex::build(&dictionary, &config).unwrap();

    let bytes = index.to_bytes();
    let err = InvertedIndex::from_bytes(&bytes[..bytes.len() - 3], config.id_scheme.clone())
        .unwrap_err();
    assert!(err.is_corrupt_index());
}

#[test]
fn inflated_list_length_is_rejected() {
    let dictionary = fixture_dictionary();
    let config = GramConfig::default().with_gram_length(2);
    let index = InvertedIndex::build(&dictionary, &config).unwrap();

    // First record's list length sits right after the 20-byte header
    // and its 4-byte gram id.
    let mut bytes = index.to_bytes();
    bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes());

    let err = InvertedIndex::from_bytes(&bytes, config.id_scheme).unwrap_err();
    assert!(err.is_corrupt_index());
}

#[test]
fn empty_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.idx");
    std::fs::write(&path, b"").unwrap();

    let err = InvertedIndex::load(
        &path,
        GramConfig::default().id_scheme,
    )
    .unwrap_err();
    assert!(err.is_corrupt_index());
}

#[test]
fn loaded_index_still_checks_dictionary() {
    let dictionary = fixture_dictionary();
    let config = GramConfig::default().with_gram_length(2);
    let index = InvertedIndex::build(&dictionary, &config).unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("grams.idx");
    index.save(&path).unwrap();
    let loaded = InvertedIndex::load(&path, config.id_scheme).unwrap();

    assert!(loaded.check_dictionary(&dictionary).is_ok());

    let wrong = Dictionary::new(vec!["ab".to_string()]).unwrap();
    assert!(loaded.check_dictionary(&wrong).is_err());
}

#[test]
fn dictionary_round_trips_with_weights() {
    let dictionary = Dictionary::with_weights(
        ["ab", "abc", "xab"].iter().map(|s| s.to_string()).collect(),
        vec![0.1, 0.2, 0.4],
    )
    .unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("dict.bin");
    dictionary.save(&path).unwrap();

    let loaded = Dictionary::load(&path).unwrap();
    assert_eq!(loaded.len(), dictionary.len());
    for (id, entry) in dictionary.iter() {
        assert_eq!(loaded.get(id), Some(entry));
        assert!((loaded.weight(id) - dictionary.weight(id)).abs() < 1e-12);
    }
}
