//! Source compatibility validation at open time.

use multibam::testutil::{MemoryReader, register};
use multibam::{MergeError, MultiReader};

use crate::helpers::coord_source;

#[test]
fn test_mismatched_reference_lengths_are_rejected_naming_the_file() {
    register(MemoryReader::new(
        "validate-x.bam",
        "coordinate",
        &[("chr1", 1000), ("chr2", 2000)],
        Vec::new(),
    ));
    register(MemoryReader::new(
        "validate-y.bam",
        "coordinate",
        &[("chr1", 1000), ("chr2", 2001)],
        Vec::new(),
    ));

    let mut reader: MultiReader<MemoryReader> = MultiReader::new();
    let err = reader.open(&["validate-x.bam", "validate-y.bam"]).unwrap_err();
    match err {
        MergeError::ReferenceMismatch { filename, reason } => {
            assert_eq!(filename, "validate-y.bam");
            assert!(reason.contains("chr2:2000"));
            assert!(reason.contains("chr2:2001"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_mismatched_reference_names_are_rejected() {
    let x = MemoryReader::new("x.bam", "coordinate", &[("chr1", 1000)], Vec::new());
    let y = MemoryReader::new("y.bam", "coordinate", &[("chrM", 1000)], Vec::new());

    let mut reader = MultiReader::new();
    let err = reader.open_readers(vec![x, y]).unwrap_err();
    assert!(matches!(err, MergeError::ReferenceMismatch { .. }));
}

#[test]
fn test_mismatched_sort_orders_are_rejected() {
    let x = MemoryReader::new("x.bam", "coordinate", &[("chr1", 1000)], Vec::new());
    let y = MemoryReader::new("y.bam", "unsorted", &[("chr1", 1000)], Vec::new());

    let mut reader = MultiReader::new();
    let err = reader.open_readers(vec![x, y]).unwrap_err();
    match err {
        MergeError::SortOrderMismatch { filename, expected, found } => {
            assert_eq!(filename, "y.bam");
            assert_eq!(expected, "coordinate");
            assert_eq!(found, "unsorted");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_sort_order_spellings_compare_exactly_even_when_both_merge_unsorted() {
    // Both spellings fall back to the unsorted discipline, but they are
    // still different declarations and must not validate.
    let x = MemoryReader::new("x.bam", "unsorted", &[("chr1", 1000)], Vec::new());
    let y = MemoryReader::new("y.bam", "unknown", &[("chr1", 1000)], Vec::new());

    let mut reader = MultiReader::new();
    let err = reader.open_readers(vec![x, y]).unwrap_err();
    assert!(matches!(err, MergeError::SortOrderMismatch { .. }));
}

#[test]
fn test_a_single_source_is_never_validated() {
    let odd = MemoryReader::new("odd.bam", "made-up-order", &[("chr1", 1000)], Vec::new());
    let mut reader = MultiReader::new();
    reader.open_readers(vec![odd]).unwrap();
    assert_eq!(reader.source_count(), 1);
}

#[test]
fn test_three_way_validation_catches_the_later_mismatch() {
    let a = coord_source("a.bam", &[]);
    let b = coord_source("b.bam", &[]);
    let c = MemoryReader::new("c.bam", "queryname", crate::helpers::REFS, Vec::new());

    let mut reader = MultiReader::new();
    let err = reader.open_readers(vec![a, b, c]).unwrap_err();
    match err {
        MergeError::SortOrderMismatch { filename, .. } => assert_eq!(filename, "c.bam"),
        other => panic!("unexpected error: {other}"),
    }
}
