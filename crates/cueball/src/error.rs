use compress::CompressError;
use std::io;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CueballError>;

/// Errors raised by cueball readers, writers, and mergers.
#[derive(Debug, Error)]
pub enum CueballError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The trailing footer failed validation; the file is unusable.
    #[error("corrupt footer: {0}")]
    CorruptFooter(String),

    /// A bucket block or record failed validation; the file is unusable.
    #[error("corrupt file: {0}")]
    Corrupt(String),

    /// The writer received key hashes out of strictly increasing order.
    /// This is a builder bug and must not produce a file.
    #[error("key hash out of order: {next} does not sort after {prev}")]
    KeyOrderViolation {
        /// Hex of the previously written key hash.
        prev: String,
        /// Hex of the offending key hash.
        next: String,
    },

    /// A key hash of the wrong width for this file's configuration.
    #[error("wrong key hash size: expected {expected} bytes, got {actual}")]
    KeyHashSize {
        expected: usize,
        actual: usize,
    },

    /// A value of the wrong width for this file's configuration.
    #[error("wrong value size: expected {expected} bytes, got {actual}")]
    ValueSize {
        expected: usize,
        actual: usize,
    },

    /// A block failed to compress or decompress.
    #[error("compression error: {0}")]
    Compress(#[from] CompressError),
}

/// Maps a poisoned reader lock to an I/O-flavored error instead of
/// panicking in a serving path.
pub(crate) fn poisoned(what: &str) -> CueballError {
    CueballError::Io(io::Error::new(
        io::ErrorKind::Other,
        format!("{} lock poisoned", what),
    ))
}

/// Renders a key hash as lowercase hex for error messages.
pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}
