//! # Curly — variable-length record logs with a cueball key index
//!
//! A curly version is a pair of files: an append-only **record file**
//! holding length-prefixed values, and a **key index** — a [cueball] file
//! whose fixed-size value slot holds the varint-encoded location of each
//! key's record.
//!
//! ## Record file layout
//!
//! ```text
//! plain:   (length: varint)(value bytes) ...
//! grouped: (block length: varint)(compressed block) ...
//!          where a block is a concatenation of plain records
//! ```
//!
//! With block grouping a key's index slot encodes `(block offset,
//! in-block offset)` instead of a bare record offset.
//!
//! ## Merging
//!
//! Record offsets shift when record files are concatenated, so two merge
//! strategies exist:
//!
//! - [`CurlyMerger`] (**append merge**): concatenates delta record files
//!   onto the base unchanged and rewrites every key-index location by a
//!   per-stream offset adjustment. O(total bytes); superseded records are
//!   kept.
//! - [`CurlyCompactingMerger`] (**compacting merge**): runs the key-level
//!   N-way merge over the key indexes and re-appends only each winning
//!   key's record to a fresh pair of files, reclaiming superseded space.

mod compact;
mod error;
mod location;
mod merge;
mod options;
mod reader;
mod writer;

pub use compact::CurlyCompactingMerger;
pub use error::{CurlyError, Result};
pub use location::CurlyLocation;
pub use merge::{CurlyMerger, OffsetTransformer};
pub use options::{BlockGrouping, CurlyOptions};
pub use reader::CurlyReader;
pub use writer::{CurlyStats, CurlyWriter};

use std::path::PathBuf;

/// The two files making up one curly version of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlyFilePair {
    /// The `.curly` record file.
    pub record_path: PathBuf,
    /// The `.cueball` key-index file.
    pub index_path: PathBuf,
}

impl CurlyFilePair {
    /// Pairs a record file with its key index.
    #[must_use]
    pub fn new(record_path: PathBuf, index_path: PathBuf) -> Self {
        Self {
            record_path,
            index_path,
        }
    }
}

#[cfg(test)]
mod tests;
