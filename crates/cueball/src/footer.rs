//! Trailing footer of a cueball file.
//!
//! The footer occupies the last `8*numBuckets + 8 + 4 + 4` bytes:
//!
//! ```text
//! [offset[0]: i64 LE] ... [offset[N-1]: i64 LE]
//! [data length: i64 LE]
//! [max uncompressed block size: i32 LE]
//! [max compressed block size: i32 LE]
//! ```
//!
//! Offsets are monotonically non-decreasing starts of each bucket's block;
//! the data length is the implicit sentinel end offset. Fields are signed on
//! the wire, and any negative value or offset inversion marks the file
//! corrupt — such a file is never served.

use crate::error::{CueballError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

/// Parsed and validated footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    bucket_offsets: Vec<u64>,
    data_length: u64,
    max_uncompressed_block_size: u32,
    max_compressed_block_size: u32,
}

/// Returns the footer size in bytes for a file with `num_buckets` buckets.
#[must_use]
pub fn footer_size(num_buckets: usize) -> u64 {
    8 * num_buckets as u64 + 8 + 4 + 4
}

impl Footer {
    /// Builds a footer from already-validated writer state.
    ///
    /// # Panics
    ///
    /// Panics if the writer produced a non-monotonic offset array; the
    /// writer owns that invariant and violating it is a bug, not bad data.
    #[must_use]
    pub fn new(
        bucket_offsets: Vec<u64>,
        data_length: u64,
        max_uncompressed_block_size: u32,
        max_compressed_block_size: u32,
    ) -> Self {
        debug_assert!(
            bucket_offsets.windows(2).all(|w| w[0] <= w[1]),
            "writer produced non-monotonic bucket offsets"
        );
        Self {
            bucket_offsets,
            data_length,
            max_uncompressed_block_size,
            max_compressed_block_size,
        }
    }

    /// Reads and validates the footer from the tail of `r`.
    ///
    /// # Errors
    ///
    /// Returns [`CueballError::CorruptFooter`] if the file is too small for
    /// the footer, any offset is negative or decreasing, any offset exceeds
    /// the data length, or either max-size field is negative.
    pub fn read<R: Read + Seek>(r: &mut R, num_buckets: usize) -> Result<Self> {
        let file_len = r.seek(SeekFrom::End(0))?;
        let size = footer_size(num_buckets);
        if file_len < size {
            return Err(CueballError::CorruptFooter(format!(
                "file too small for footer: {} < {}",
                file_len, size
            )));
        }
        r.seek(SeekFrom::End(-(size as i64)))?;

        let mut bucket_offsets = Vec::with_capacity(num_buckets);
        let mut prev: i64 = 0;
        for i in 0..num_buckets {
            let off = r.read_i64::<LittleEndian>()?;
            if off < 0 {
                return Err(CueballError::CorruptFooter(format!(
                    "negative offset {} for bucket {}",
                    off, i
                )));
            }
            if off < prev {
                return Err(CueballError::CorruptFooter(format!(
                    "bucket {} offset {} decreases below {}",
                    i, off, prev
                )));
            }
            prev = off;
            bucket_offsets.push(off as u64);
        }

        let data_length = r.read_i64::<LittleEndian>()?;
        if data_length < 0 {
            return Err(CueballError::CorruptFooter(format!(
                "negative data length {}",
                data_length
            )));
        }
        if prev > data_length {
            return Err(CueballError::CorruptFooter(format!(
                "last bucket offset {} exceeds data length {}",
                prev, data_length
            )));
        }

        let max_uncompressed = r.read_i32::<LittleEndian>()?;
        if max_uncompressed < 0 {
            return Err(CueballError::CorruptFooter(format!(
                "negative max uncompressed block size {}",
                max_uncompressed
            )));
        }
        let max_compressed = r.read_i32::<LittleEndian>()?;
        if max_compressed < 0 {
            return Err(CueballError::CorruptFooter(format!(
                "negative max compressed block size {}",
                max_compressed
            )));
        }

        Ok(Self {
            bucket_offsets,
            data_length: data_length as u64,
            max_uncompressed_block_size: max_uncompressed as u32,
            max_compressed_block_size: max_compressed as u32,
        })
    }

    /// Writes the footer to `w`.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        for &off in &self.bucket_offsets {
            w.write_i64::<LittleEndian>(off as i64)?;
        }
        w.write_i64::<LittleEndian>(self.data_length as i64)?;
        w.write_i32::<LittleEndian>(self.max_uncompressed_block_size as i32)?;
        w.write_i32::<LittleEndian>(self.max_compressed_block_size as i32)?;
        Ok(())
    }

    /// Returns the byte range `[start, end)` owned by `bucket`.
    ///
    /// The end offset of the last bucket is the data length.
    #[must_use]
    pub fn bucket_range(&self, bucket: usize) -> (u64, u64) {
        let start = self.bucket_offsets[bucket];
        let end = if bucket + 1 < self.bucket_offsets.len() {
            self.bucket_offsets[bucket + 1]
        } else {
            self.data_length
        };
        (start, end)
    }

    /// Number of buckets described by this footer.
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        self.bucket_offsets.len()
    }

    /// Total length of the data section (everything before the footer).
    #[must_use]
    pub fn data_length(&self) -> u64 {
        self.data_length
    }

    /// Largest uncompressed bucket block in the file.
    #[must_use]
    pub fn max_uncompressed_block_size(&self) -> u32 {
        self.max_uncompressed_block_size
    }

    /// Largest stored (possibly compressed) bucket block in the file.
    #[must_use]
    pub fn max_compressed_block_size(&self) -> u32 {
        self.max_compressed_block_size
    }
}
