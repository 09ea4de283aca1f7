//! Error types for multi-source merge operations.

use std::io;

use thiserror::Error;

/// Result type alias for multibam operations
pub type Result<T> = std::result::Result<T, MergeError>;

/// Error type for multi-source merge operations
#[derive(Error, Debug)]
pub enum MergeError {
    /// One or more input paths failed to open. Paths that did open stay live;
    /// the merged stream continues over them.
    #[error("failed to open input file(s): {}", .failed.join("; "))]
    OpenFailed {
        /// "path: cause" for each path that did not open
        failed: Vec<String>,
    },

    /// A source declares a different sort order than the first source.
    /// Fatal: the merged stream must be discarded.
    #[error("mismatched sort order in '{filename}': expected '{expected}', found '{found}'")]
    SortOrderMismatch {
        /// The offending file
        filename: String,
        /// The first source's `@HD SO` spelling
        expected: String,
        /// The offending source's `@HD SO` spelling
        found: String,
    },

    /// A source's reference table differs from the first source's.
    /// Fatal: the merged stream must be discarded.
    #[error("mismatched reference sequences in '{filename}': {reason}")]
    ReferenceMismatch {
        /// The offending file
        filename: String,
        /// Which entry (or count) disagreed
        reason: String,
    },

    /// A source could not be repositioned to its first record.
    #[error("could not rewind '{filename}'")]
    RewindFailed {
        /// The offending file
        filename: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A source produced a real read error (not end-of-stream), either during
    /// a sequential read or while rebuilding the lookahead cache.
    #[error("failed to read record from '{filename}'")]
    ReadFailed {
        /// The offending file
        filename: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// One or more sources ended up without a loaded index.
    #[error("no index available for: {}", .filenames.join(", "))]
    IndexMissing {
        /// Sources still lacking an index
        filenames: Vec<String>,
    },

    /// More index paths were supplied than there are open sources.
    #[error("{paths} index path(s) supplied but only {sources} source(s) open")]
    IndexCountMismatch {
        /// Number of index paths supplied
        paths: usize,
        /// Number of open sources
        sources: usize,
    },

    /// The merged header could not be serialized to text.
    #[error("failed to serialize merged header")]
    HeaderSynthesis(#[source] io::Error),
}
