//! Utilities for constructing alignment data and in-memory sources in tests.
//!
//! [`RawRecordBuilder`] encodes single records in the raw binary layout that
//! [`crate::record::RecordHandle`] consumes. [`MemoryReader`] is a complete
//! in-memory [`FileReader`] implementation; register one under a path with
//! [`register`] to exercise the path-based open flow, or hand readers to
//! [`crate::MultiReader::open_readers`] directly.

use std::collections::HashMap;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use bstr::BString;
use noodles::sam::Header;
use noodles::sam::header::record::value::map::header::tag as header_tag;
use noodles::sam::header::record::value::map::{ReadGroup, ReferenceSequence};
use noodles::sam::header::record::value::{Map, map};

use crate::reader::{FileReader, IndexCacheMode, IndexKind, RefEntry};
use crate::record::RecordHandle;
use crate::region::Region;

/// Builds a header with the given `@HD SO` value (skipped when empty),
/// reference sequences, and read-group ids.
#[must_use]
pub fn build_header(sort_order: &str, refs: &[(&str, u32)], read_groups: &[&str]) -> Header {
    let mut builder = Header::builder();

    if !sort_order.is_empty() {
        let hd = Map::<map::Header>::builder()
            .insert(header_tag::SORT_ORDER, BString::from(sort_order))
            .build()
            .expect("valid @HD record");
        builder = builder.set_header(hd);
    }

    for (name, length) in refs {
        let length = NonZeroUsize::new(*length as usize).expect("non-zero reference length");
        builder =
            builder.add_reference_sequence(name.as_bytes(), Map::<ReferenceSequence>::new(length));
    }

    for id in read_groups {
        builder = builder.add_read_group(*id, Map::<ReadGroup>::default());
    }

    builder.build()
}

/// Maps an ASCII base to its 4-bit code (`=ACMGRSVTWYHKDBN`); anything
/// unrecognized encodes as N.
fn base_code(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'=' => 0,
        b'A' => 1,
        b'C' => 2,
        b'M' => 3,
        b'G' => 4,
        b'R' => 5,
        b'S' => 6,
        b'V' => 7,
        b'T' => 8,
        b'W' => 9,
        b'Y' => 10,
        b'H' => 11,
        b'K' => 12,
        b'D' => 13,
        b'B' => 14,
        _ => 15,
    }
}

/// Builder for one raw binary record (without the block_size prefix).
#[derive(Debug, Clone)]
pub struct RawRecordBuilder {
    name: String,
    ref_id: i32,
    position: i32,
    mapping_quality: u8,
    flags: u16,
    sequence: Vec<u8>,
    qualities: Option<Vec<u8>>,
    mate_ref_id: i32,
    mate_position: i32,
    template_length: i32,
    tags: Vec<u8>,
}

impl RawRecordBuilder {
    /// Starts a record with the given query name, unmapped by default.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ref_id: -1,
            position: -1,
            mapping_quality: 60,
            flags: 0,
            sequence: Vec::new(),
            qualities: None,
            mate_ref_id: -1,
            mate_position: -1,
            template_length: 0,
            tags: Vec::new(),
        }
    }

    /// Sets the reference sequence id.
    #[must_use]
    pub fn ref_id(mut self, ref_id: i32) -> Self {
        self.ref_id = ref_id;
        self
    }

    /// Sets the 0-based alignment position.
    #[must_use]
    pub fn position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    /// Marks the record unmapped.
    #[must_use]
    pub fn unmapped(mut self) -> Self {
        self.ref_id = -1;
        self.position = -1;
        self.flags |= 0x4;
        self
    }

    /// Sets extra flag bits.
    #[must_use]
    pub fn flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets the mapping quality.
    #[must_use]
    pub fn mapping_quality(mut self, mapping_quality: u8) -> Self {
        self.mapping_quality = mapping_quality;
        self
    }

    /// Sets the base sequence.
    #[must_use]
    pub fn sequence(mut self, sequence: &str) -> Self {
        self.sequence = sequence.as_bytes().to_vec();
        self
    }

    /// Sets per-base qualities; defaults to 0xFF (missing) bytes.
    #[must_use]
    pub fn qualities(mut self, qualities: &[u8]) -> Self {
        self.qualities = Some(qualities.to_vec());
        self
    }

    /// Sets mate reference id and position.
    #[must_use]
    pub fn mate(mut self, ref_id: i32, position: i32) -> Self {
        self.mate_ref_id = ref_id;
        self.mate_position = position;
        self
    }

    /// Sets the observed template length.
    #[must_use]
    pub fn template_length(mut self, template_length: i32) -> Self {
        self.template_length = template_length;
        self
    }

    /// Appends a `Z`-typed (NUL-terminated string) aux tag.
    #[must_use]
    pub fn string_tag(mut self, tag: &[u8; 2], value: &str) -> Self {
        self.tags.extend_from_slice(tag);
        self.tags.push(b'Z');
        self.tags.extend_from_slice(value.as_bytes());
        self.tags.push(0);
        self
    }

    /// Encodes the record.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let l_read_name = self.name.len() + 1; // with NUL
        let l_seq = self.sequence.len();
        let qualities = self
            .qualities
            .clone()
            .unwrap_or_else(|| vec![0xFF; l_seq]);
        assert_eq!(qualities.len(), l_seq, "qualities must match sequence length");

        let mut flags = self.flags;
        if self.ref_id < 0 {
            flags |= 0x4;
        }
        let n_cigar_op: u16 = u16::from(self.ref_id >= 0 && l_seq > 0);

        let mut record = Vec::with_capacity(32 + l_read_name + l_seq * 2);
        record.extend_from_slice(&self.ref_id.to_le_bytes());
        record.extend_from_slice(&self.position.to_le_bytes());
        record.push(l_read_name as u8);
        record.push(self.mapping_quality);
        record.extend_from_slice(&0u16.to_le_bytes()); // bin
        record.extend_from_slice(&n_cigar_op.to_le_bytes());
        record.extend_from_slice(&flags.to_le_bytes());
        record.extend_from_slice(&(l_seq as u32).to_le_bytes());
        record.extend_from_slice(&self.mate_ref_id.to_le_bytes());
        record.extend_from_slice(&self.mate_position.to_le_bytes());
        record.extend_from_slice(&self.template_length.to_le_bytes());

        record.extend_from_slice(self.name.as_bytes());
        record.push(0);

        if n_cigar_op == 1 {
            let op: u32 = (l_seq as u32) << 4; // <l_seq>M
            record.extend_from_slice(&op.to_le_bytes());
        }

        // Two bases per byte, high nibble first.
        for pair in self.sequence.chunks(2) {
            let high = base_code(pair[0]) << 4;
            let low = if pair.len() > 1 { base_code(pair[1]) } else { 0 };
            record.push(high | low);
        }

        record.extend_from_slice(&qualities);
        record.extend_from_slice(&self.tags);
        record
    }
}

fn fixtures() -> &'static Mutex<HashMap<PathBuf, MemoryReader>> {
    static FIXTURES: OnceLock<Mutex<HashMap<PathBuf, MemoryReader>>> = OnceLock::new();
    FIXTURES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registers a reader under its own filename so that
/// `MemoryReader::open(path)` can find it. Use unique filenames per test;
/// the registry is shared process-wide.
pub fn register(reader: MemoryReader) {
    let path = PathBuf::from(&reader.filename);
    fixtures().lock().expect("fixture registry poisoned").insert(path, reader);
}

/// In-memory [`FileReader`] over a list of pre-encoded records.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    filename: String,
    header: Header,
    refs: Vec<RefEntry>,
    records: Vec<Vec<u8>>,
    cursor: usize,
    open: bool,
    region: Option<Region>,
    has_index: bool,
    index_locatable: bool,
    index_openable: bool,
    fail_reposition: bool,
    fail_rewind: bool,
    fail_read_at: Option<usize>,
    cache_mode: IndexCacheMode,
}

impl MemoryReader {
    /// Creates a reader over pre-encoded records with a header built from
    /// the sort order and reference list.
    #[must_use]
    pub fn new(
        filename: &str,
        sort_order: &str,
        refs: &[(&str, u32)],
        records: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            header: build_header(sort_order, refs, &[]),
            refs: refs.iter().map(|(name, length)| RefEntry::new(*name, *length)).collect(),
            records,
            cursor: 0,
            open: true,
            region: None,
            has_index: false,
            index_locatable: false,
            index_openable: true,
            fail_reposition: false,
            fail_rewind: false,
            fail_read_at: None,
            cache_mode: IndexCacheMode::default(),
        }
    }

    /// Adds read groups to the header.
    #[must_use]
    pub fn with_read_groups(mut self, ids: &[&str]) -> Self {
        for id in ids {
            self.header.read_groups_mut().insert(BString::from(*id), Map::<ReadGroup>::default());
        }
        self
    }

    /// Sets whether an index is already loaded.
    #[must_use]
    pub fn with_index(mut self, has_index: bool) -> Self {
        self.has_index = has_index;
        self
    }

    /// Makes `locate_index` succeed.
    #[must_use]
    pub fn with_locatable_index(mut self) -> Self {
        self.index_locatable = true;
        self
    }

    /// Makes `open_index` report failure.
    #[must_use]
    pub fn with_unopenable_index(mut self) -> Self {
        self.index_openable = false;
        self
    }

    /// Makes `jump` and `set_region` report "nothing there".
    #[must_use]
    pub fn with_failing_reposition(mut self) -> Self {
        self.fail_reposition = true;
        self
    }

    /// Makes `rewind` fail with an I/O error.
    #[must_use]
    pub fn with_failing_rewind(mut self) -> Self {
        self.fail_rewind = true;
        self
    }

    /// Injects a read error once the cursor reaches the given record index.
    #[must_use]
    pub fn with_read_error_at(mut self, index: usize) -> Self {
        self.fail_read_at = Some(index);
        self
    }

    /// The index cache mode most recently forwarded to this reader.
    #[must_use]
    pub fn index_cache_mode(&self) -> IndexCacheMode {
        self.cache_mode
    }

    /// (ref rank, position) of a raw record, with unmapped ranking last.
    fn record_key(raw: &[u8]) -> (u32, i32) {
        let ref_id = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let position = i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let rank = if ref_id < 0 { u32::MAX } else { ref_id as u32 };
        (rank, position)
    }

    fn rank(ref_id: i32) -> u32 {
        if ref_id < 0 { u32::MAX } else { ref_id as u32 }
    }

    /// Index of the first record at or after `(ref_id, position)`.
    fn first_at_or_after(&self, ref_id: i32, position: i32) -> Option<usize> {
        let target = (Self::rank(ref_id), position);
        self.records.iter().position(|raw| Self::record_key(raw) >= target)
    }
}

impl FileReader for MemoryReader {
    fn open(path: &Path) -> io::Result<Self> {
        fixtures().lock().expect("fixture registry poisoned").get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no fixture registered for '{}'", path.display()),
            )
        })
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn reference_data(&self) -> &[RefEntry] {
        &self.refs
    }

    fn next_core(&mut self, handle: &mut RecordHandle) -> io::Result<bool> {
        if !self.open || self.cursor >= self.records.len() {
            return Ok(false);
        }
        if self.fail_read_at == Some(self.cursor) {
            return Err(io::Error::other("injected read error"));
        }

        let raw = &self.records[self.cursor];
        if let Some(region) = &self.region {
            if region.is_right_bound_specified() {
                let right = (Self::rank(region.right_ref_id), region.right_position);
                if Self::record_key(raw) >= right {
                    return Ok(false);
                }
            }
        }

        handle.load(raw)?;
        self.cursor += 1;
        Ok(true)
    }

    fn rewind(&mut self) -> io::Result<()> {
        if self.fail_rewind {
            return Err(io::Error::other("injected rewind error"));
        }
        self.cursor = 0;
        self.region = None;
        Ok(())
    }

    fn jump(&mut self, ref_id: i32, position: i32) -> io::Result<bool> {
        if self.fail_reposition {
            return Ok(false);
        }
        self.region = None;
        match self.first_at_or_after(ref_id, position) {
            Some(idx) => {
                self.cursor = idx;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_region(&mut self, region: &Region) -> io::Result<bool> {
        if self.fail_reposition {
            return Ok(false);
        }
        self.region = Some(*region);
        match self.first_at_or_after(region.left_ref_id, region.left_position) {
            Some(idx) => {
                self.cursor = idx;
                Ok(true)
            }
            None => {
                self.cursor = self.records.len();
                Ok(false)
            }
        }
    }

    fn has_index(&self) -> bool {
        self.has_index
    }

    fn locate_index(&mut self, _preferred: IndexKind) -> io::Result<bool> {
        if self.index_locatable {
            self.has_index = true;
        }
        Ok(self.index_locatable)
    }

    fn create_index(&mut self, _kind: IndexKind) -> io::Result<bool> {
        self.has_index = true;
        Ok(true)
    }

    fn open_index(&mut self, _path: &Path) -> io::Result<bool> {
        if self.index_openable {
            self.has_index = true;
        }
        Ok(self.index_openable)
    }

    fn set_index_cache_mode(&mut self, mode: IndexCacheMode) {
        self.cache_mode = mode;
    }
}
