//! Index management across sources: presence checks, locate/create, and the
//! positional pairing of `open_indexes`.

use multibam::testutil::MemoryReader;
use multibam::{FileReader, IndexCacheMode, IndexKind, MergeError, MultiReader};

use crate::helpers::coord_source;

#[test]
fn test_has_indexes_requires_every_source() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![
            coord_source("a.bam", &[]).with_index(true),
            coord_source("b.bam", &[]),
        ])
        .unwrap();

    assert!(!reader.has_indexes());
}

#[test]
fn test_has_indexes_is_false_with_no_sources() {
    let reader: MultiReader<MemoryReader> = MultiReader::new();
    assert!(!reader.has_indexes());
}

#[test]
fn test_locate_indexes_only_touches_sources_without_one() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![
            coord_source("a.bam", &[]).with_index(true),
            coord_source("b.bam", &[]).with_locatable_index(),
        ])
        .unwrap();

    reader.locate_indexes(IndexKind::Bai).unwrap();
    assert!(reader.has_indexes());
}

#[test]
fn test_locate_indexes_reports_every_source_still_missing() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![
            coord_source("a.bam", &[]),
            coord_source("b.bam", &[]).with_locatable_index(),
            coord_source("c.bam", &[]),
        ])
        .unwrap();

    let err = reader.locate_indexes(IndexKind::Csi).unwrap_err();
    match err {
        MergeError::IndexMissing { filenames } => assert_eq!(filenames, ["a.bam", "c.bam"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_create_indexes_builds_for_every_source_lacking_one() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![coord_source("a.bam", &[]), coord_source("b.bam", &[])])
        .unwrap();

    assert!(!reader.has_indexes());
    reader.create_indexes(IndexKind::Bai).unwrap();
    assert!(reader.has_indexes());
}

#[test]
fn test_open_indexes_pairs_paths_with_sources_positionally() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![coord_source("a.bam", &[]), coord_source("b.bam", &[])])
        .unwrap();

    reader.open_indexes(&["a.bam.bai", "b.bam.bai"]).unwrap();
    assert!(reader.has_indexes());
}

#[test]
fn test_open_indexes_with_fewer_paths_stops_early() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![coord_source("a.bam", &[]), coord_source("b.bam", &[])])
        .unwrap();

    reader.open_indexes(&["a.bam.bai"]).unwrap();

    let indexed: Vec<bool> = reader.sources().map(FileReader::has_index).collect();
    assert_eq!(indexed, [true, false]);
}

#[test]
fn test_open_indexes_with_more_paths_than_sources_fails_immediately() {
    let mut reader = MultiReader::new();
    reader.open_readers(vec![coord_source("a.bam", &[])]).unwrap();

    let err = reader.open_indexes(&["a.bai", "b.bai", "c.bai"]).unwrap_err();
    assert!(matches!(err, MergeError::IndexCountMismatch { paths: 3, sources: 1 }));
}

#[test]
fn test_open_indexes_reports_per_source_failures() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![
            coord_source("a.bam", &[]),
            coord_source("b.bam", &[]).with_unopenable_index(),
        ])
        .unwrap();

    let err = reader.open_indexes(&["a.bai", "b.bai"]).unwrap_err();
    match err {
        MergeError::IndexMissing { filenames } => assert_eq!(filenames, ["b.bam"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_index_cache_mode_is_forwarded_to_every_source() {
    let mut reader = MultiReader::new();
    reader
        .open_readers(vec![coord_source("a.bam", &[]), coord_source("b.bam", &[])])
        .unwrap();

    reader.set_index_cache_mode(IndexCacheMode::Full);
    for source in reader.sources() {
        assert_eq!(source.index_cache_mode(), IndexCacheMode::Full);
    }
}
