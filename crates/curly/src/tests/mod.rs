mod writer_tests;

use crate::{CurlyFilePair, CurlyOptions, CurlyStats, CurlyWriter};
use anyhow::Result;
use std::path::Path;

/// Small geometry used across the test modules: 2-byte hashes, 5-byte
/// location slots, 4 buckets.
pub fn small_options() -> CurlyOptions {
    CurlyOptions::new(2, 5, 2)
}

/// Builds a fixed-width key hash from a u16, big-endian so numeric order
/// matches byte order.
pub fn hash2(n: u16) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

/// Spreads keys across buckets while preserving numeric order.
pub fn k(n: u16) -> Vec<u8> {
    hash2(n * 1000)
}

/// Names the record/index file pair for one version in `dir`.
pub fn pair(dir: &Path, name: &str) -> CurlyFilePair {
    CurlyFilePair::new(
        dir.join(format!("{}.curly", name)),
        dir.join(format!("{}.cueball", name)),
    )
}

/// Writes a complete curly version from `(key, value)` entries.
pub fn write_pair(
    files: &CurlyFilePair,
    options: CurlyOptions,
    entries: &[(u16, &[u8])],
) -> Result<CurlyStats> {
    let mut w = CurlyWriter::create(&files.record_path, &files.index_path, options)?;
    for &(key, value) in entries {
        w.write(&k(key), value)?;
    }
    Ok(w.close()?)
}
