//! Sort-order inspection and merged-header synthesis.

use std::io;

use bstr::{BStr, ByteSlice};
use noodles::sam::Header;

/// Declared record ordering of a single file, from the `@HD SO` field.
///
/// Anything other than the four standard spellings parses as [`Self::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Records sorted by (reference id, position).
    Coordinate,
    /// Records sorted by query name.
    Queryname,
    /// Records in no particular order.
    Unsorted,
    /// Ordering not declared or not recognized.
    #[default]
    Unknown,
}

impl SortOrder {
    /// Parses the `@HD SO` field of a header.
    #[must_use]
    pub fn from_header(header: &Header) -> Self {
        match sort_order_text(header).as_bytes() {
            b"coordinate" => Self::Coordinate,
            b"queryname" => Self::Queryname,
            b"unsorted" => Self::Unsorted,
            _ => Self::Unknown,
        }
    }

    /// The SAM header spelling of this sort order.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinate => "coordinate",
            Self::Queryname => "queryname",
            Self::Unsorted => "unsorted",
            Self::Unknown => "unknown",
        }
    }
}

/// Raw `@HD SO` value, empty when absent.
///
/// Source compatibility checks compare these spellings exactly; two files
/// whose orders both fall back to the unsorted merge discipline are still
/// incompatible if their declared spellings differ.
#[must_use]
pub fn sort_order_text(header: &Header) -> &BStr {
    header
        .header()
        .and_then(|hd| hd.other_fields().get(b"SO"))
        .map_or_else(|| BStr::new(b""), |so| BStr::new(so))
}

/// Merges `other`'s read groups into `merged`, keeping the existing entry
/// whenever a read-group id is already present.
pub fn merge_read_groups(merged: &mut Header, other: &Header) {
    for (id, read_group) in other.read_groups() {
        if !merged.read_groups().contains_key(id) {
            merged.read_groups_mut().insert(id.clone(), read_group.clone());
        }
    }
}

/// Serializes a header back to SAM text.
pub fn to_text(header: &Header) -> io::Result<String> {
    let mut writer = noodles::sam::io::Writer::new(Vec::new());
    writer.write_header(header)?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}
