use compress::CompressError;
use cueball::CueballError;
use std::io;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CurlyError>;

/// Errors raised by curly readers, writers, and mergers.
#[derive(Debug, Error)]
pub enum CurlyError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A key-index failure (corrupt footer, order violation, ...).
    #[error("key index error: {0}")]
    Index(#[from] CueballError),

    /// A record block failed to compress or decompress.
    #[error("compression error: {0}")]
    Compress(#[from] CompressError),

    /// A record or block failed validation; the file is unusable.
    #[error("corrupt record file: {0}")]
    Corrupt(String),

    /// A record location's varint encoding does not fit the key index's
    /// fixed value slot. The slot width is a domain configuration error.
    #[error("location {offset} does not fit in a {slot_size}-byte index slot")]
    LocationOverflow {
        offset: u64,
        slot_size: usize,
    },
}

// The compacting merge runs inside the cueball merge loop, whose sink
// returns cueball errors; curly failures cross that seam losslessly where
// a variant exists and as a corruption report otherwise.
impl From<CurlyError> for CueballError {
    fn from(e: CurlyError) -> Self {
        match e {
            CurlyError::Io(io) => CueballError::Io(io),
            CurlyError::Index(inner) => inner,
            CurlyError::Compress(c) => CueballError::Compress(c),
            other => CueballError::Corrupt(other.to_string()),
        }
    }
}
