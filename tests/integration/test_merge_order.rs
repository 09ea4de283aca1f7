//! Merge ordering across sources: coordinate, name, and unsorted
//! disciplines, stability, and stream completeness.

use multibam::testutil::{MemoryReader, RawRecordBuilder};
use multibam::{MultiReader, RecordHandle};

use crate::helpers::{REFS, coord_source, name_source, read_all, read_names};

#[test]
fn test_two_coordinate_sources_merge_stably() {
    let x = coord_source("x.bam", &[(0, 10), (0, 30), (1, 5)]);
    let y = coord_source("y.bam", &[(0, 10), (0, 20)]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    let got: Vec<(String, i32, i32)> =
        read_all(&mut reader).into_iter().map(|(file, _, r, p)| (file, r, p)).collect();
    assert_eq!(
        got,
        [
            ("x.bam".to_string(), 0, 10),
            ("y.bam".to_string(), 0, 10),
            ("y.bam".to_string(), 0, 20),
            ("x.bam".to_string(), 0, 30),
            ("x.bam".to_string(), 1, 5),
        ]
    );
}

#[test]
fn test_unmapped_records_sort_after_every_reference() {
    let x = MemoryReader::new(
        "x.bam",
        "coordinate",
        REFS,
        vec![RawRecordBuilder::new("u").unmapped().build()],
    );
    let y = coord_source("y.bam", &[(2, 100)]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    let got: Vec<(i32, i32)> =
        read_all(&mut reader).into_iter().map(|(_, _, r, p)| (r, p)).collect();
    assert_eq!(got, [(2, 100), (-1, -1)]);
}

#[test]
fn test_queryname_sources_merge_lexicographically() {
    let x = name_source("x.bam", &["a", "c"]);
    let y = name_source("y.bam", &["b", "d"]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    assert_eq!(read_names(&mut reader), ["a", "b", "c", "d"]);
}

#[test]
fn test_name_merge_is_byte_wise_not_natural() {
    let x = name_source("x.bam", &["r1", "r2"]);
    let y = name_source("y.bam", &["r10"]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    assert_eq!(read_names(&mut reader), ["r1", "r10", "r2"]);
}

#[test]
fn test_equal_name_ties_break_by_source_order() {
    let x = name_source("x.bam", &["dup"]);
    let y = name_source("y.bam", &["dup"]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    let files: Vec<String> = read_all(&mut reader).into_iter().map(|(file, _, _, _)| file).collect();
    assert_eq!(files, ["x.bam", "y.bam"]);
}

#[test]
fn test_unsorted_sources_drain_source_by_source_in_native_order() {
    let records_x = vec![
        RawRecordBuilder::new("x0").ref_id(2).position(900).build(),
        RawRecordBuilder::new("x1").ref_id(0).position(1).build(),
    ];
    let records_y = vec![RawRecordBuilder::new("y0").ref_id(1).position(5).build()];
    let x = MemoryReader::new("x.bam", "unsorted", REFS, records_x);
    let y = MemoryReader::new("y.bam", "unsorted", REFS, records_y);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    assert_eq!(read_names(&mut reader), ["x0", "x1", "y0"]);
}

#[test]
fn test_unrecognized_sort_order_merges_unsorted() {
    let x = MemoryReader::new(
        "x.bam",
        "made-up-order",
        REFS,
        vec![RawRecordBuilder::new("x0").ref_id(1).position(999).build()],
    );
    let y = MemoryReader::new(
        "y.bam",
        "made-up-order",
        REFS,
        vec![RawRecordBuilder::new("y0").ref_id(0).position(1).build()],
    );

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    // Unsorted discipline ignores coordinates entirely.
    assert_eq!(read_names(&mut reader), ["x0", "y0"]);
}

#[test]
fn test_merged_stream_is_the_multiset_union_of_sources() {
    let x = coord_source("x.bam", &[(0, 1), (0, 5), (1, 2), (2, 9)]);
    let y = coord_source("y.bam", &[(0, 2), (1, 2)]);
    let z = coord_source("z.bam", &[]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y, z]).unwrap();

    let mut names = read_names(&mut reader);
    names.sort();
    assert_eq!(names, ["x.bam:0", "x.bam:1", "x.bam:2", "x.bam:3", "y.bam:0", "y.bam:1"]);
}

#[test]
fn test_exhausted_source_never_reappears() {
    let x = coord_source("x.bam", &[(0, 1)]);
    let y = coord_source("y.bam", &[(0, 2), (0, 3), (0, 4)]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y]).unwrap();

    let files: Vec<String> = read_all(&mut reader).into_iter().map(|(file, _, _, _)| file).collect();
    assert_eq!(files, ["x.bam", "y.bam", "y.bam", "y.bam"]);
}

#[test]
fn test_emitted_records_are_non_decreasing_between_repositions() {
    let x = coord_source("x.bam", &[(0, 3), (0, 7), (1, 1), (2, 4)]);
    let y = coord_source("y.bam", &[(0, 5), (1, 1), (1, 9)]);
    let z = coord_source("z.bam", &[(0, 1), (2, 2)]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x, y, z]).unwrap();

    let keys: Vec<(i32, i32)> = read_all(&mut reader).into_iter().map(|(_, _, r, p)| (r, p)).collect();
    assert_eq!(keys.len(), 9);
    for pair in keys.windows(2) {
        assert!(pair[0] <= pair[1], "stream went backwards: {pair:?}");
    }
}

#[test]
fn test_next_core_defers_text_and_next_materializes() {
    let raw = RawRecordBuilder::new("r")
        .ref_id(0)
        .position(1)
        .sequence("ACGT")
        .qualities(&[30; 4])
        .build();
    let x = MemoryReader::new("x.bam", "coordinate", REFS, vec![raw]);

    let mut reader = MultiReader::new();
    reader.open_readers(vec![x]).unwrap();

    let mut record = RecordHandle::new();
    assert!(reader.next_core(&mut record).unwrap());
    assert!(!record.text_built());
    assert!(record.filename().is_empty());

    reader.rewind().unwrap();
    assert!(reader.next(&mut record).unwrap());
    assert!(record.text_built());
    assert_eq!(record.sequence(), "ACGT");
    assert_eq!(record.filename(), "x.bam");
}
