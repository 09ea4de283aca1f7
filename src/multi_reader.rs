//! Coordinated reading of many alignment files as one merged stream.

use std::path::Path;

use log::{error, warn};
use noodles::sam::Header;

use crate::errors::{MergeError, Result};
use crate::header::{self, SortOrder};
use crate::merge::cache::MergeCache;
use crate::merge::order::MergeOrdering;
use crate::reader::{FileReader, IndexCacheMode, IndexKind, RefEntry};
use crate::record::RecordHandle;
use crate::region::Region;

/// One source's slot in the merged stream: its reader plus the one-record
/// lookahead handle the reader is refilled into.
#[derive(Debug)]
pub struct MergeItem<R> {
    reader: R,
    handle: RecordHandle,
}

impl<R> MergeItem<R> {
    fn new(reader: R) -> Self {
        Self { reader, handle: RecordHandle::new() }
    }

    /// The source's reader.
    #[must_use]
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// The source's lookahead record.
    #[must_use]
    pub fn record(&self) -> &RecordHandle {
        &self.handle
    }
}

/// Reads any number of BAM sources as a single logically merged stream.
///
/// Sources are validated for mutual compatibility (shared sort order,
/// element-wise equal reference tables) whenever two or more are open.
/// Between repositioning operations ([`Self::rewind`], [`Self::jump`],
/// [`Self::set_region`], and [`Self::open`] itself), records come out in
/// non-decreasing order under the ordering derived from the first source's
/// declared sort order, ties broken by source insertion order.
///
/// A `MultiReader` is not safe for concurrent use; callers provide external
/// mutual exclusion if they share one.
#[derive(Debug)]
pub struct MultiReader<R> {
    items: Vec<MergeItem<R>>,
    cache: Option<MergeCache>,
}

impl<R> MultiReader<R> {
    /// Creates a multi-reader with no sources.
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new(), cache: None }
    }

    /// Number of live sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.items.len()
    }

    /// The live sources' readers, in source order.
    pub fn sources(&self) -> impl Iterator<Item = &R> {
        self.items.iter().map(MergeItem::reader)
    }
}

impl<R> Default for MultiReader<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FileReader> MultiReader<R> {
    /// Opens each path and appends it as a source. Opening is additive:
    /// sources opened earlier stay live and are rewound to their first
    /// record before the new ones join.
    ///
    /// Paths that fail to open are logged, collected into
    /// [`MergeError::OpenFailed`], and do not tear down the sources that did
    /// open. With two or more live sources the set is validated; a
    /// validation failure is fatal for the merged stream and takes
    /// precedence over the open report.
    pub fn open<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<()> {
        if !self.items.is_empty() {
            self.rewind_readers()?;
        }

        let mut readers = Vec::with_capacity(paths.len());
        let mut failed = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.as_os_str().is_empty() {
                continue;
            }
            match R::open(path) {
                Ok(reader) => readers.push(reader),
                Err(e) => {
                    error!("could not open '{}': {e}", path.display());
                    failed.push(format!("{}: {e}", path.display()));
                }
            }
        }

        self.open_readers(readers)?;

        if failed.is_empty() { Ok(()) } else { Err(MergeError::OpenFailed { failed }) }
    }

    /// Opens a single path; see [`Self::open`].
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.open(&[path])
    }

    /// Attaches already-open readers as sources, then validates the set and
    /// rebuilds the lookahead cache. This is the tail of [`Self::open`] and
    /// is also the way to feed in readers constructed by other means.
    pub fn open_readers(&mut self, readers: Vec<R>) -> Result<()> {
        for reader in readers {
            self.items.push(MergeItem::new(reader));
        }

        if self.items.len() > 1 {
            self.validate_readers()?;
        }

        self.update_cache()
    }

    /// Closes every source and drops the cache.
    pub fn close(&mut self) {
        let filenames = self.filenames();
        self.close_files(&filenames);
    }

    /// Closes the first source whose filename matches exactly. Its cache
    /// entry is evicted before the reader is released, so the merged stream
    /// keeps every other source's cached record. Unknown filenames are
    /// silently skipped; when the last source goes, the cache goes with it.
    pub fn close_file(&mut self, filename: &str) {
        let Some(idx) = self.items.iter().position(|item| item.reader.filename() == filename)
        else {
            return;
        };

        if let Some(cache) = self.cache.as_mut() {
            cache.remove_source(idx);
        }

        let mut item = self.items.remove(idx);
        item.reader.close();

        if self.items.is_empty() {
            self.cache = None;
        }
    }

    /// Closes each named source; see [`Self::close_file`].
    pub fn close_files<S: AsRef<str>>(&mut self, filenames: &[S]) {
        for filename in filenames {
            let filename = filename.as_ref();
            if filename.is_empty() {
                continue;
            }
            self.close_file(filename);
        }
    }

    /// Non-empty filenames of all live sources, in source order.
    #[must_use]
    pub fn filenames(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.reader.filename().to_string())
            .filter(|filename| !filename.is_empty())
            .collect()
    }

    /// True while any source's underlying stream reports open.
    #[must_use]
    pub fn has_open_readers(&self) -> bool {
        self.items.iter().any(|item| item.reader.is_open())
    }

    /// Repositions every source to its first record and rebuilds the cache.
    pub fn rewind(&mut self) -> Result<()> {
        self.rewind_readers()?;
        self.update_cache()
    }

    fn rewind_readers(&mut self) -> Result<()> {
        let mut first_failure = None;
        for item in &mut self.items {
            if let Err(e) = item.reader.rewind() {
                error!("could not rewind '{}': {e}", item.reader.filename());
                if first_failure.is_none() {
                    first_failure = Some(MergeError::RewindFailed {
                        filename: item.reader.filename().to_string(),
                        source: e,
                    });
                }
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Seeks every source to the first record at or after
    /// `(ref_id, position)`, then rebuilds the cache.
    ///
    /// Best-effort per source: a reader that cannot reach the target is
    /// treated as having no records there. It stays live but contributes
    /// nothing to the cache until the next reposition. The returned status
    /// is that of the cache rebuild.
    pub fn jump(&mut self, ref_id: i32, position: i32) -> Result<()> {
        let mut skip = vec![false; self.items.len()];
        for (idx, item) in self.items.iter_mut().enumerate() {
            match item.reader.jump(ref_id, position) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("could not jump '{}' to {ref_id}:{position}", item.reader.filename());
                    skip[idx] = true;
                }
                Err(e) => {
                    warn!("could not jump '{}' to {ref_id}:{position}: {e}", item.reader.filename());
                    skip[idx] = true;
                }
            }
        }
        self.rebuild_cache(&skip)
    }

    /// Restricts every source to `region`, then rebuilds the cache. Same
    /// best-effort semantics as [`Self::jump`].
    pub fn set_region(&mut self, region: Region) -> Result<()> {
        let mut skip = vec![false; self.items.len()];
        for (idx, item) in self.items.iter_mut().enumerate() {
            match item.reader.set_region(&region) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("could not set region {region} on '{}'", item.reader.filename());
                    skip[idx] = true;
                }
                Err(e) => {
                    warn!("could not set region {region} on '{}': {e}", item.reader.filename());
                    skip[idx] = true;
                }
            }
        }
        self.rebuild_cache(&skip)
    }

    /// Produces the next record in merged order with its text fields
    /// materialized and its source filename attached. Returns `Ok(false)`
    /// when every source is exhausted.
    pub fn next(&mut self, record: &mut RecordHandle) -> Result<bool> {
        self.pop_next(record, true)
    }

    /// Produces the next record in merged order without materializing text
    /// fields. Returns `Ok(false)` when every source is exhausted.
    pub fn next_core(&mut self, record: &mut RecordHandle) -> Result<bool> {
        self.pop_next(record, false)
    }

    fn pop_next(&mut self, out: &mut RecordHandle, materialize: bool) -> Result<bool> {
        let Some(cache) = self.cache.as_mut() else {
            return Ok(false);
        };
        let Some(source) = cache.pop_min() else {
            return Ok(false);
        };

        let item = &mut self.items[source];
        if materialize {
            item.handle.build_text().map_err(|e| MergeError::ReadFailed {
                filename: item.reader.filename().to_string(),
                source: e,
            })?;
            item.handle.set_filename(item.reader.filename());
        }

        out.clone_from(&item.handle);

        // Refill this source's slot; at end of stream the source simply
        // leaves the cache until the next reposition.
        match item.reader.next_core(&mut item.handle) {
            Ok(true) => cache.insert(source, &item.handle),
            Ok(false) => {}
            Err(e) => {
                return Err(MergeError::ReadFailed {
                    filename: item.reader.filename().to_string(),
                    source: e,
                });
            }
        }

        Ok(true)
    }

    /// Number of reference sequences, taken from the first source (all live
    /// sources are validated to agree).
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.items.first().map_or(0, |item| item.reader.reference_count())
    }

    /// Reference table, taken from the first source.
    #[must_use]
    pub fn reference_data(&self) -> &[RefEntry] {
        self.items.first().map_or(&[], |item| item.reader.reference_data())
    }

    /// Id of the named reference, -1 when absent or no sources are open.
    #[must_use]
    pub fn reference_id(&self, name: &[u8]) -> i32 {
        self.items.first().map_or(-1, |item| item.reader.reference_id(name))
    }

    /// Merged view of the sources' headers: everything from the first
    /// source, plus the read groups of every later source. A read-group id
    /// seen earlier wins; later duplicates are skipped.
    #[must_use]
    pub fn header(&self) -> Header {
        let Some(first) = self.items.first() else {
            return Header::default();
        };
        let mut merged = first.reader.header().clone();
        for item in &self.items[1..] {
            header::merge_read_groups(&mut merged, item.reader.header());
        }
        merged
    }

    /// The merged header serialized to SAM text; empty when no sources are
    /// open.
    pub fn header_text(&self) -> Result<String> {
        if self.items.is_empty() {
            return Ok(String::new());
        }
        header::to_text(&self.header()).map_err(MergeError::HeaderSynthesis)
    }

    /// True iff every live source has an index loaded (false with no
    /// sources). Indicates whether [`Self::jump`] and [`Self::set_region`]
    /// can be expected to succeed everywhere.
    #[must_use]
    pub fn has_indexes(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.reader.has_index())
    }

    /// Tries to locate and load an index of the preferred kind for every
    /// source that lacks one. Sources still without an index afterwards are
    /// reported in [`MergeError::IndexMissing`].
    pub fn locate_indexes(&mut self, preferred: IndexKind) -> Result<()> {
        let mut missing = Vec::new();
        for item in &mut self.items {
            if item.reader.has_index() {
                continue;
            }
            match item.reader.locate_index(preferred) {
                Ok(true) => {}
                Ok(false) => missing.push(item.reader.filename().to_string()),
                Err(e) => {
                    warn!("could not locate index for '{}': {e}", item.reader.filename());
                    missing.push(item.reader.filename().to_string());
                }
            }
        }
        if missing.is_empty() { Ok(()) } else { Err(MergeError::IndexMissing { filenames: missing }) }
    }

    /// Builds an index of the given kind for every source that lacks one.
    pub fn create_indexes(&mut self, kind: IndexKind) -> Result<()> {
        let mut missing = Vec::new();
        for item in &mut self.items {
            if item.reader.has_index() {
                continue;
            }
            match item.reader.create_index(kind) {
                Ok(true) => {}
                Ok(false) => missing.push(item.reader.filename().to_string()),
                Err(e) => {
                    warn!("could not create index for '{}': {e}", item.reader.filename());
                    missing.push(item.reader.filename().to_string());
                }
            }
        }
        if missing.is_empty() { Ok(()) } else { Err(MergeError::IndexMissing { filenames: missing }) }
    }

    /// Opens the i-th index path on the i-th source, in list order. More
    /// paths than sources fails immediately with
    /// [`MergeError::IndexCountMismatch`]; fewer paths stops early and
    /// leaves the remaining sources untouched. The pairing is positional
    /// only; no correspondence between path and source is checked.
    pub fn open_indexes<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<()> {
        if paths.len() > self.items.len() {
            return Err(MergeError::IndexCountMismatch {
                paths: paths.len(),
                sources: self.items.len(),
            });
        }

        let mut missing = Vec::new();
        for (item, path) in self.items.iter_mut().zip(paths) {
            match item.reader.open_index(path.as_ref()) {
                Ok(true) => {}
                Ok(false) => missing.push(item.reader.filename().to_string()),
                Err(e) => {
                    warn!("could not open index for '{}': {e}", item.reader.filename());
                    missing.push(item.reader.filename().to_string());
                }
            }
        }
        if missing.is_empty() { Ok(()) } else { Err(MergeError::IndexMissing { filenames: missing }) }
    }

    /// Forwards the index cache mode to every source.
    pub fn set_index_cache_mode(&mut self, mode: IndexCacheMode) {
        for item in &mut self.items {
            item.reader.set_index_cache_mode(mode);
        }
    }

    /// Checks that every live source declares the same sort order as the
    /// first and carries an element-wise identical reference table. The
    /// sort-order check compares the raw `@HD SO` spellings; reference
    /// entries compare by name and length. On failure the merged stream
    /// must be discarded.
    fn validate_readers(&self) -> Result<()> {
        let Some(first) = self.items.first() else {
            return Ok(());
        };

        let expected_order = header::sort_order_text(first.reader.header());
        let expected_refs = first.reader.reference_data();

        for item in &self.items[1..] {
            let filename = item.reader.filename();

            let found_order = header::sort_order_text(item.reader.header());
            if found_order != expected_order {
                return Err(MergeError::SortOrderMismatch {
                    filename: filename.to_string(),
                    expected: expected_order.to_string(),
                    found: found_order.to_string(),
                });
            }

            let refs = item.reader.reference_data();
            if refs.len() != expected_refs.len() {
                return Err(MergeError::ReferenceMismatch {
                    filename: filename.to_string(),
                    reason: format!(
                        "expected {} reference sequences, found {}",
                        expected_refs.len(),
                        refs.len()
                    ),
                });
            }

            for (expected, found) in expected_refs.iter().zip(refs) {
                if expected != found {
                    return Err(MergeError::ReferenceMismatch {
                        filename: filename.to_string(),
                        reason: format!(
                            "expected {}:{}, found {}:{}",
                            expected.name, expected.length, found.name, found.length
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Rebuilds the cache from each source's next record: see
    /// [`Self::rebuild_cache`] with no sources skipped.
    fn update_cache(&mut self) -> Result<()> {
        self.rebuild_cache(&[])
    }

    /// Clears and refills the cache with the next record of each source, in
    /// insertion order. Creates the cache on first use with the ordering
    /// derived from the first source's declared sort order; drops it when no
    /// sources are left. Sources flagged in `skip` sit this round out.
    /// Per-source end-of-stream is not an error; a real read error aborts
    /// the rebuild.
    fn rebuild_cache(&mut self, skip: &[bool]) -> Result<()> {
        if self.items.is_empty() {
            self.cache = None;
            return Ok(());
        }

        let mut cache = match self.cache.take() {
            Some(cache) => cache,
            None => {
                let order = SortOrder::from_header(self.items[0].reader.header());
                MergeCache::new(MergeOrdering::for_sort_order(order))
            }
        };
        cache.clear();

        let mut result = Ok(());
        for (idx, item) in self.items.iter_mut().enumerate() {
            if skip.get(idx).copied().unwrap_or(false) {
                continue;
            }
            match item.reader.next_core(&mut item.handle) {
                Ok(true) => cache.insert(idx, &item.handle),
                Ok(false) => {}
                Err(e) => {
                    result = Err(MergeError::ReadFailed {
                        filename: item.reader.filename().to_string(),
                        source: e,
                    });
                    break;
                }
            }
        }

        self.cache = Some(cache);
        result
    }
}
