//! Shared fixtures for the integration tests.

use multibam::testutil::{MemoryReader, RawRecordBuilder};
use multibam::{MultiReader, RecordHandle};

/// Reference table shared by compatible fixture sources.
pub const REFS: &[(&str, u32)] = &[("chr1", 1000), ("chr2", 2000), ("chr3", 1500)];

/// A coordinate-sorted source whose record names are `<filename>:<index>`.
pub fn coord_source(filename: &str, records: &[(i32, i32)]) -> MemoryReader {
    let raw = records
        .iter()
        .enumerate()
        .map(|(i, &(ref_id, position))| {
            RawRecordBuilder::new(&format!("{filename}:{i}"))
                .ref_id(ref_id)
                .position(position)
                .build()
        })
        .collect();
    MemoryReader::new(filename, "coordinate", REFS, raw)
}

/// A queryname-sorted source over the given read names.
pub fn name_source(filename: &str, names: &[&str]) -> MemoryReader {
    let raw = names.iter().map(|name| RawRecordBuilder::new(name).build()).collect();
    MemoryReader::new(filename, "queryname", REFS, raw)
}

/// Drains the merged stream via `next`, returning
/// `(source filename, name, ref_id, position)` per record.
pub fn read_all(reader: &mut MultiReader<MemoryReader>) -> Vec<(String, String, i32, i32)> {
    let mut out = Vec::new();
    let mut record = RecordHandle::new();
    while reader.next(&mut record).expect("merged read failed") {
        out.push((
            record.filename().to_string(),
            record.name().to_string(),
            record.ref_id(),
            record.position(),
        ));
    }
    out
}

/// Drains the merged stream, returning record names only.
pub fn read_names(reader: &mut MultiReader<MemoryReader>) -> Vec<String> {
    read_all(reader).into_iter().map(|(_, name, _, _)| name).collect()
}
