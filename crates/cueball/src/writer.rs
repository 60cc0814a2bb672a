use crate::error::{hex, CueballError, Result};
use crate::footer::Footer;
use crate::options::CueballOptions;
use codec::{varint, HashPrefixCalculator};
use std::fs::{rename, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Byte and record counters reported when a writer (or merger) closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CueballStats {
    /// Uncompressed data bytes accepted (key hash + value per record).
    pub bytes_written: u64,
    /// Records accepted.
    pub records_written: u64,
}

/// Writes a cueball file from key-hash/value pairs supplied in strictly
/// increasing key-hash order.
///
/// Entries for one bucket are buffered into a block; when the bucket
/// changes the block is (optionally compressed and) appended to the file
/// and the footer's offset array is back-filled, including zero-length
/// entries for any empty buckets in between. The footer is written last.
///
/// The write is crash-safe: data goes to `<path>.tmp`, is fsynced, and is
/// atomically renamed into place by [`close`](CueballWriter::close). A
/// writer dropped without `close` leaves only the temp file behind.
pub struct CueballWriter {
    file: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    options: CueballOptions,
    prefix: HashPrefixCalculator,
    /// Start offset of each bucket's block, back-filled as blocks are cut.
    bucket_offsets: Vec<u64>,
    /// First bucket whose offset has not been assigned yet.
    next_offset_bucket: usize,
    /// Bucket owning the entries currently buffered in `block`.
    current_bucket: Option<usize>,
    block: Vec<u8>,
    last_hash: Option<Vec<u8>>,
    /// Bytes of the data section emitted so far.
    data_pos: u64,
    max_uncompressed_block_size: u32,
    max_compressed_block_size: u32,
    stats: CueballStats,
}

impl CueballWriter {
    /// Creates a writer targeting `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, options: CueballOptions) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();
        let tmp_path = tmp_sibling(&final_path);
        let raw = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let num_buckets = options.num_buckets();
        Ok(Self {
            file: BufWriter::new(raw),
            tmp_path,
            final_path,
            prefix: options.prefix_calculator(),
            options,
            bucket_offsets: vec![0; num_buckets],
            next_offset_bucket: 0,
            current_bucket: None,
            block: Vec::new(),
            last_hash: None,
            data_pos: 0,
            max_uncompressed_block_size: 0,
            max_compressed_block_size: 0,
            stats: CueballStats::default(),
        })
    }

    /// Appends one `(key hash, value)` tuple.
    ///
    /// # Errors
    ///
    /// Returns [`CueballError::KeyOrderViolation`] if `key_hash` does not
    /// sort strictly after the previous hash (duplicates included), and
    /// size errors if either side has the wrong width.
    pub fn write(&mut self, key_hash: &[u8], value: &[u8]) -> Result<()> {
        if key_hash.len() != self.options.key_hash_size {
            return Err(CueballError::KeyHashSize {
                expected: self.options.key_hash_size,
                actual: key_hash.len(),
            });
        }
        if value.len() != self.options.value_size {
            return Err(CueballError::ValueSize {
                expected: self.options.value_size,
                actual: value.len(),
            });
        }
        if let Some(prev) = &self.last_hash {
            if key_hash <= prev.as_slice() {
                return Err(CueballError::KeyOrderViolation {
                    prev: hex(prev),
                    next: hex(key_hash),
                });
            }
        }

        let bucket = self.prefix.bucket(key_hash);
        if self.current_bucket != Some(bucket) {
            self.cut_block()?;
            self.current_bucket = Some(bucket);
        }

        self.block.extend_from_slice(key_hash);
        self.block.extend_from_slice(value);
        self.last_hash = Some(key_hash.to_vec());
        self.stats.records_written += 1;
        self.stats.bytes_written += self.options.entry_size() as u64;
        Ok(())
    }

    /// Records accepted so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.stats.records_written
    }

    /// Uncompressed data bytes accepted so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.stats.bytes_written
    }

    /// Flushes the buffered block for `current_bucket` to the file and
    /// back-fills bucket offsets up to and including that bucket. Empty
    /// buckets receive the start offset of the next non-empty block, which
    /// keeps the offset array monotonic and their ranges empty.
    fn cut_block(&mut self) -> Result<()> {
        let bucket = match self.current_bucket.take() {
            Some(b) => b,
            None => return Ok(()),
        };
        let start = self.data_pos;
        for b in self.next_offset_bucket..=bucket {
            self.bucket_offsets[b] = start;
        }
        self.next_offset_bucket = bucket + 1;

        let uncompressed = self.block.len() as u32;
        self.max_uncompressed_block_size = self.max_uncompressed_block_size.max(uncompressed);

        if self.options.codec.is_compressed() {
            let compressed = self.options.codec.compress(&self.block)?;
            let prefix_len = varint::write(&mut self.file, compressed.len() as u64)?;
            self.file.write_all(&compressed)?;
            self.data_pos += prefix_len as u64 + compressed.len() as u64;
            self.max_compressed_block_size =
                self.max_compressed_block_size.max(compressed.len() as u32);
        } else {
            self.file.write_all(&self.block)?;
            self.data_pos += u64::from(uncompressed);
            self.max_compressed_block_size = self.max_compressed_block_size.max(uncompressed);
        }
        self.block.clear();
        Ok(())
    }

    /// Flushes the final block, writes the footer, fsyncs, and atomically
    /// renames the temp file into place. Returns the final counters.
    ///
    /// # Errors
    ///
    /// Any failure leaves the target path untouched; only the temp file may
    /// remain for a later cleanup pass.
    pub fn close(mut self) -> Result<CueballStats> {
        self.cut_block()?;
        for b in self.next_offset_bucket..self.bucket_offsets.len() {
            self.bucket_offsets[b] = self.data_pos;
        }

        let footer = Footer::new(
            std::mem::take(&mut self.bucket_offsets),
            self.data_pos,
            self.max_uncompressed_block_size,
            self.max_compressed_block_size,
        );
        footer.write(&mut self.file)?;

        self.file.flush()?;
        let inner = self
            .file
            .into_inner()
            .map_err(|e| CueballError::Io(e.into_error()))?;
        inner.sync_all()?;
        rename(&self.tmp_path, &self.final_path)?;
        sync_parent_dir(&self.final_path);
        Ok(self.stats)
    }
}

/// Returns `<path>.tmp` without clobbering the format suffix.
pub(crate) fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp", name))
}

/// Best-effort fsync of the parent directory so the rename survives a
/// crash on filesystems that do not journal directory entries.
pub(crate) fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
