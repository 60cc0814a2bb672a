//! # Cueball — hash-indexed fixed-value-size partition files
//!
//! Immutable, write-once files holding `(key hash, value)` tuples of fixed
//! widths, bucketed by a hash prefix for point lookups. Cueball files serve
//! two roles: a standalone storage format for small fixed-size values, and
//! the key index of the [curly] variable-length record format.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ BUCKET BLOCK 0                                                │
//! │   (key_hash: keyHashSize bytes)(value: valueSize bytes)       │
//! │   ... tuples sorted ascending by key_hash ...                 │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BUCKET BLOCK 1 .. N-1  (N = 2^hashIndexBits)                  │
//! │   an empty bucket contributes zero bytes                      │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (always last 8*N + 8 + 4 + 4 bytes)                    │
//! │   N × bucket offset (i64 LE)                                  │
//! │   data length (i64 LE)                                        │
//! │   max uncompressed block size (i32 LE)                        │
//! │   max compressed block size (i32 LE)                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! When block compression is enabled each bucket block is stored as
//! `(block length: varint)(compressed bytes)` instead of the raw tuples.
//! Bucket `i` owns the byte range `[offset[i], offset[i+1])` with the data
//! length acting as the sentinel end offset.
//!
//! ## Components
//!
//! | Module     | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | [`footer`] | Trailing metadata parse/validate/write               |
//! | [`writer`] | Sorted append-only writer with order enforcement     |
//! | [`reader`] | Point lookups with private L1/L2 caches              |
//! | [`merge`]  | StreamBuffer cursors + N-way highest-version merge   |

mod error;
pub mod footer;
mod merge;
mod options;
mod reader;
mod writer;

pub use error::{CueballError, Result};
pub use footer::Footer;
pub use merge::{merge_entries, CueballMerger, StreamBuffer, ValueTransformer};
pub use options::CueballOptions;
pub use reader::{CueballReader, Get};
pub use writer::{CueballStats, CueballWriter};

#[cfg(test)]
mod tests;
