//! Total orders over per-source lookahead records.
//!
//! All three orders compare only fields that [`crate::record::RecordHandle`]
//! decodes eagerly; none requires materialized text. Ties are broken by
//! source insertion order so equal-key records come out in the order their
//! files were opened (stable merge).

use bstr::BString;

use crate::header::SortOrder;
use crate::record::RecordHandle;

/// Ordering discipline of a merge cache, fixed at cache construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOrdering {
    /// (reference id, position), unmapped records last.
    ByCoordinate,
    /// Byte-wise lexicographic query name.
    ByName,
    /// Source insertion order only: each source's backlog is drained in its
    /// native order, source by source.
    Unsorted,
}

impl MergeOrdering {
    /// Selects the discipline for a file's declared sort order. Anything
    /// other than coordinate or queryname merges unsorted.
    #[must_use]
    pub fn for_sort_order(order: SortOrder) -> Self {
        match order {
            SortOrder::Coordinate => Self::ByCoordinate,
            SortOrder::Queryname => Self::ByName,
            SortOrder::Unsorted | SortOrder::Unknown => Self::Unsorted,
        }
    }

    /// Extracts the comparison key for a freshly loaded record.
    pub(crate) fn key_for(self, record: &RecordHandle) -> MergeKey {
        match self {
            Self::ByCoordinate => MergeKey::Coordinate {
                ref_rank: ref_rank(record.ref_id()),
                position: record.position(),
            },
            Self::ByName => MergeKey::Name(record.name().to_owned()),
            Self::Unsorted => MergeKey::Unsorted,
        }
    }
}

/// Maps a reference id onto a rank where unmapped (-1) sorts after every
/// mapped reference.
fn ref_rank(ref_id: i32) -> u32 {
    if ref_id < 0 { u32::MAX } else { ref_id as u32 }
}

/// Comparison key extracted from one record under one ordering.
///
/// A cache only ever holds keys of the variant matching its ordering, so the
/// derived cross-variant order is never exercised.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MergeKey {
    /// Key for [`MergeOrdering::ByCoordinate`].
    Coordinate { ref_rank: u32, position: i32 },
    /// Key for [`MergeOrdering::ByName`].
    Name(BString),
    /// Key for [`MergeOrdering::Unsorted`]: all records compare equal, so the
    /// source tiebreak decides alone.
    Unsorted,
}
