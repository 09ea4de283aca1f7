//! Priority cache selecting the next merged record across sources.
//!
//! The cache holds at most one entry per source: the comparison key of the
//! record currently sitting in that source's lookahead handle, plus the
//! source's index in the multi-reader's source list. Entries hold indices
//! rather than references, so the cache never borrows into the source list.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::order::{MergeKey, MergeOrdering};
use crate::record::RecordHandle;

/// One live entry: the extracted key plus the owning source's index.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    key: MergeKey,
    source: usize,
}

impl Ord for CacheEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key).then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for CacheEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-oriented cache over per-source lookahead records.
///
/// The ordering is fixed for the cache's lifetime. Each source appears at
/// most once; a source is present exactly while its handle holds an unread
/// record.
#[derive(Debug)]
pub struct MergeCache {
    ordering: MergeOrdering,
    heap: BinaryHeap<Reverse<CacheEntry>>,
}

impl MergeCache {
    /// Creates an empty cache with the given ordering.
    #[must_use]
    pub fn new(ordering: MergeOrdering) -> Self {
        Self { ordering, heap: BinaryHeap::new() }
    }

    /// The ordering this cache was constructed with.
    #[must_use]
    pub fn ordering(&self) -> MergeOrdering {
        self.ordering
    }

    /// Inserts `source`'s freshly loaded record.
    ///
    /// The source must not already be present; the multi-reader only inserts
    /// after a pop or a full rebuild, which upholds this.
    pub fn insert(&mut self, source: usize, record: &RecordHandle) {
        debug_assert!(!self.contains(source), "source {source} inserted twice");
        self.heap.push(Reverse(CacheEntry { key: self.ordering.key_for(record), source }));
    }

    /// Removes and returns the source index holding the minimum record under
    /// the active ordering, or `None` when the cache is empty.
    pub fn pop_min(&mut self) -> Option<usize> {
        self.heap.pop().map(|Reverse(entry)| entry.source)
    }

    /// Evicts the entry for `source` (a no-op if absent) and renumbers
    /// entries above it, mirroring the source's removal from the source
    /// list. Relative order between the remaining entries is unchanged.
    pub fn remove_source(&mut self, source: usize) {
        self.heap = std::mem::take(&mut self.heap)
            .into_iter()
            .filter_map(|Reverse(mut entry)| match entry.source.cmp(&source) {
                Ordering::Less => Some(Reverse(entry)),
                Ordering::Equal => None,
                Ordering::Greater => {
                    entry.source -= 1;
                    Some(Reverse(entry))
                }
            })
            .collect();
    }

    /// Empties the cache without touching any handle.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// True when no source has an unread record cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of sources currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when `source` has an entry in the cache.
    #[must_use]
    pub fn contains(&self, source: usize) -> bool {
        self.heap.iter().any(|Reverse(entry)| entry.source == source)
    }
}
