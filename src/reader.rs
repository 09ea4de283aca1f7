//! Capability contract for single-file readers feeding a merged stream.
//!
//! The merge engine never parses files itself: each source is driven through
//! the [`FileReader`] trait, which packages the operations a single-file BAM
//! reader already provides (open, sequential core reads, rewind, indexed
//! seeks, region restriction, index lifecycle). An in-memory implementation
//! for tests lives in [`crate::testutil`].

use std::io;
use std::path::Path;

use bstr::BString;
use noodles::sam::Header;

use crate::record::RecordHandle;
use crate::region::Region;

/// One entry of a reference table: a named sequence and its length.
///
/// Two entries are equal iff both name and length match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// Reference sequence name.
    pub name: BString,
    /// Reference sequence length in bases.
    pub length: u32,
}

impl RefEntry {
    /// Creates a reference entry.
    #[must_use]
    pub fn new<N: Into<BString>>(name: N, length: u32) -> Self {
        Self { name: name.into(), length }
    }
}

/// On-disk index flavour to look up or build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// Binary alignment index (`.bai`).
    #[default]
    Bai,
    /// Coordinate-sorted index (`.csi`).
    Csi,
}

/// How aggressively a reader caches index data in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexCacheMode {
    /// Keep only the most recently used index pages.
    #[default]
    Limited,
    /// Keep the whole index resident.
    Full,
    /// Re-read index data on every use.
    None,
}

/// Capability a single-file reader must provide to join a merged stream.
///
/// Every method is best-effort where the contract says so: `jump` and
/// `set_region` may report `Ok(false)` to mean "no records there", which the
/// merge engine treats as an empty source for the current window rather than
/// a failure. `next_core` reports `Ok(false)` at end of stream; `Err` is
/// reserved for real I/O or decode errors.
pub trait FileReader {
    /// Opens the file at `path`, reading its header and reference table.
    fn open(path: &Path) -> io::Result<Self>
    where
        Self: Sized;

    /// Releases the underlying file resources.
    fn close(&mut self);

    /// True while the underlying stream is open.
    fn is_open(&self) -> bool;

    /// The path this reader was opened with.
    fn filename(&self) -> &str;

    /// Parsed header of this file.
    fn header(&self) -> &Header;

    /// The file's reference table, in file order.
    fn reference_data(&self) -> &[RefEntry];

    /// Number of reference sequences.
    fn reference_count(&self) -> usize {
        self.reference_data().len()
    }

    /// Id of the named reference, -1 when absent.
    fn reference_id(&self, name: &[u8]) -> i32 {
        self.reference_data()
            .iter()
            .position(|entry| entry.name.as_slice() == name)
            .map_or(-1, |idx| idx as i32)
    }

    /// Loads the next record into `handle`, decoding only the positional
    /// fields. Returns `Ok(false)` at end of stream.
    fn next_core(&mut self, handle: &mut RecordHandle) -> io::Result<bool>;

    /// Repositions the stream to its first record.
    fn rewind(&mut self) -> io::Result<()>;

    /// Seeks to the first record at or after `(ref_id, position)`.
    /// `Ok(false)` means no records there; the stream yields nothing until
    /// the next reposition.
    fn jump(&mut self, ref_id: i32, position: i32) -> io::Result<bool>;

    /// Restricts iteration to `region`, with the same best-effort semantics
    /// as [`Self::jump`].
    fn set_region(&mut self, region: &Region) -> io::Result<bool>;

    /// True when an index is loaded for this file.
    fn has_index(&self) -> bool;

    /// Attempts to find and load an index of the preferred kind next to the
    /// file. `Ok(false)` when none was found.
    fn locate_index(&mut self, preferred: IndexKind) -> io::Result<bool>;

    /// Builds (and loads) an index of the given kind for this file.
    fn create_index(&mut self, kind: IndexKind) -> io::Result<bool>;

    /// Loads the index at `path` for this file.
    fn open_index(&mut self, path: &Path) -> io::Result<bool>;

    /// Sets how the loaded index caches its data.
    fn set_index_cache_mode(&mut self, mode: IndexCacheMode);
}
