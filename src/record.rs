//! Reusable buffer owning one partially decoded alignment record.
//!
//! A [`RecordHandle`] holds the raw BAM-encoded bytes of a single record plus
//! the positional fields decoded eagerly at load time: reference id, 0-based
//! position, and query name. Everything else (sequence, qualities, aux tags)
//! stays packed until [`RecordHandle::build_text`] is called, so records that
//! are only compared and merged never pay for full decoding.
//!
//! # Record binary layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0-3     4     refID (i32) - reference sequence ID, -1 if unmapped
//! 4-7     4     pos (i32) - 0-based leftmost position
//! 8       1     l_read_name (u8) - length of read name + NUL
//! 9       1     mapq (u8) - mapping quality
//! 10-11   2     bin (u16)
//! 12-13   2     n_cigar_op (u16)
//! 14-15   2     flag (u16)
//! 16-19   4     l_seq (u32)
//! 20-23   4     next_refID (i32)
//! 24-27   4     next_pos (i32)
//! 28-31   4     tlen (i32)
//! 32+     var   read_name, cigar, packed seq, qual, aux tags
//! ```

use std::io;

use bstr::{BStr, BString, ByteSlice};

/// Reference id denoting an unmapped or unknown reference.
pub const UNMAPPED_REF_ID: i32 = -1;

/// Length of the fixed-field block at the start of every record.
const FIXED_FIELDS_LEN: usize = 32;

/// 4-bit base code -> ASCII base, per the SAM spec section 4.2.3.
const BASE_DECODE: [u8; 16] = *b"=ACMGRSVTWYHKDBN";

#[inline]
fn read_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[inline]
fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// One partially decoded alignment record in a reusable buffer.
///
/// The handle is bound to a single source while it sits in a merged stream:
/// the multi-reader refills it from the same reader after every pop, and
/// stamps the source filename onto it for text-materializing reads.
#[derive(Debug, Clone, Default)]
pub struct RecordHandle {
    /// Raw record bytes, without the 4-byte block_size prefix.
    data: Vec<u8>,
    ref_id: i32,
    position: i32,
    name: BString,
    text_built: bool,
    sequence: BString,
    qualities: Vec<u8>,
    tags_start: usize,
    filename: String,
}

impl RecordHandle {
    /// Creates an empty handle ready to be loaded.
    #[must_use]
    pub fn new() -> Self {
        Self { ref_id: UNMAPPED_REF_ID, position: -1, ..Self::default() }
    }

    /// Loads raw record bytes into the handle, decoding the positional fields
    /// and resetting any previously materialized text fields.
    ///
    /// The slice must not include the 4-byte block_size prefix.
    ///
    /// # Errors
    /// Returns `InvalidData` if the record is shorter than the fixed-field
    /// block or its read name runs past the end of the buffer.
    pub fn load(&mut self, raw: &[u8]) -> io::Result<()> {
        if raw.len() < FIXED_FIELDS_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("record of {} bytes is shorter than the {FIXED_FIELDS_LEN}-byte fixed block", raw.len()),
            ));
        }

        let l_read_name = raw[8] as usize;
        if l_read_name == 0 || FIXED_FIELDS_LEN + l_read_name > raw.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("read name of {l_read_name} bytes does not fit record of {} bytes", raw.len()),
            ));
        }

        self.data.clear();
        self.data.extend_from_slice(raw);

        self.ref_id = read_i32(raw, 0);
        self.position = read_i32(raw, 4);

        // Name is NUL-terminated; drop the terminator.
        self.name.clear();
        self.name.extend_from_slice(&raw[FIXED_FIELDS_LEN..FIXED_FIELDS_LEN + l_read_name - 1]);

        self.text_built = false;
        self.sequence.clear();
        self.qualities.clear();
        self.tags_start = 0;

        Ok(())
    }

    /// True once a record has been loaded into this handle.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !self.data.is_empty()
    }

    /// Reference sequence id, [`UNMAPPED_REF_ID`] for unmapped records.
    #[must_use]
    pub fn ref_id(&self) -> i32 {
        self.ref_id
    }

    /// 0-based leftmost alignment position.
    #[must_use]
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Query (read) name.
    #[must_use]
    pub fn name(&self) -> &BStr {
        self.name.as_bstr()
    }

    /// True when the record aligns to a reference sequence.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.ref_id >= 0
    }

    /// Bitwise flags, 0 when no record is loaded.
    #[must_use]
    pub fn flags(&self) -> u16 {
        if self.data.len() < FIXED_FIELDS_LEN { 0 } else { read_u16(&self.data, 14) }
    }

    /// Mapping quality, 0 when no record is loaded.
    #[must_use]
    pub fn mapping_quality(&self) -> u8 {
        self.data.get(9).copied().unwrap_or(0)
    }

    /// Mate reference id, [`UNMAPPED_REF_ID`] when unset or no record loaded.
    #[must_use]
    pub fn mate_ref_id(&self) -> i32 {
        if self.data.len() < FIXED_FIELDS_LEN { UNMAPPED_REF_ID } else { read_i32(&self.data, 20) }
    }

    /// Mate 0-based position, -1 when unset or no record loaded.
    #[must_use]
    pub fn mate_position(&self) -> i32 {
        if self.data.len() < FIXED_FIELDS_LEN { -1 } else { read_i32(&self.data, 24) }
    }

    /// Observed template length, 0 when no record loaded.
    #[must_use]
    pub fn template_length(&self) -> i32 {
        if self.data.len() < FIXED_FIELDS_LEN { 0 } else { read_i32(&self.data, 28) }
    }

    /// Raw record bytes as loaded.
    #[must_use]
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Materializes the text fields (sequence, qualities, tag region) from the
    /// raw bytes. Idempotent: repeated calls after the first are free.
    ///
    /// # Errors
    /// Returns `InvalidData` when the variable-length regions run past the end
    /// of the record.
    pub fn build_text(&mut self) -> io::Result<()> {
        if self.text_built {
            return Ok(());
        }
        if self.data.len() < FIXED_FIELDS_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "no record loaded"));
        }

        let l_read_name = self.data[8] as usize;
        let n_cigar_op = read_u16(&self.data, 12) as usize;
        let l_seq = read_i32(&self.data, 16).max(0) as usize;

        let seq_start = FIXED_FIELDS_LEN + l_read_name + n_cigar_op * 4;
        let qual_start = seq_start + l_seq.div_ceil(2);
        let tags_start = qual_start + l_seq;
        if tags_start > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("sequence and qualities of {l_seq} bases do not fit record of {} bytes", self.data.len()),
            ));
        }

        // Two bases per byte: high nibble first.
        self.sequence.clear();
        self.sequence.reserve(l_seq);
        for i in 0..l_seq {
            let byte = self.data[seq_start + i / 2];
            let code = if i % 2 == 0 { byte >> 4 } else { byte & 0xF };
            self.sequence.push(BASE_DECODE[code as usize]);
        }

        self.qualities.clear();
        self.qualities.extend_from_slice(&self.data[qual_start..tags_start]);

        self.tags_start = tags_start;
        self.text_built = true;
        Ok(())
    }

    /// True once the text fields have been materialized.
    #[must_use]
    pub fn text_built(&self) -> bool {
        self.text_built
    }

    /// ASCII bases; empty until [`Self::build_text`] has run.
    #[must_use]
    pub fn sequence(&self) -> &BStr {
        self.sequence.as_bstr()
    }

    /// Raw phred scores (0xFF bytes when absent); empty until
    /// [`Self::build_text`] has run.
    #[must_use]
    pub fn qualities(&self) -> &[u8] {
        &self.qualities
    }

    /// Raw aux-tag bytes; empty until [`Self::build_text`] has run.
    #[must_use]
    pub fn tags(&self) -> &[u8] {
        if self.text_built { &self.data[self.tags_start..] } else { &[] }
    }

    /// Path of the source this record came from, stamped by the multi-reader
    /// on text-materializing reads.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub(crate) fn set_filename(&mut self, filename: &str) {
        self.filename.clear();
        self.filename.push_str(filename);
    }
}
