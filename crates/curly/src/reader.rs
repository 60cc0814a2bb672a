use crate::error::{CurlyError, Result};
use crate::location::CurlyLocation;
use crate::options::CurlyOptions;
use codec::varint;
use cueball::{CueballReader, Get};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Point-lookup reader over one immutable curly version.
///
/// A lookup resolves the key through the cueball key index, decodes the
/// location slot, and reads the record from the record file. With block
/// grouping, decompressed record blocks are cached per reader; the cache
/// is bounded by wholesale eviction like the index caches and dies with
/// the reader, so a version swap can never serve stale blocks.
///
/// The [`Get`] returned reuses the index's cache observability: `l1_hit`
/// is the index's recent-lookup cache, and `l2_hit` is set when either
/// the index bucket block or the record block came from cache.
pub struct CurlyReader {
    index: CueballReader,
    options: CurlyOptions,
    record_file: Mutex<File>,
    record_file_len: u64,
    block_cache: Mutex<HashMap<u64, Arc<Vec<u8>>>>,
}

impl CurlyReader {
    /// Opens the record file at `record_path` with its key index at
    /// `index_path`.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        record_path: P,
        index_path: Q,
        options: CurlyOptions,
    ) -> Result<Self> {
        let index = CueballReader::open(index_path, options.index)?;
        let record_file = File::open(record_path)?;
        let record_file_len = record_file.metadata()?.len();
        Ok(Self {
            index,
            options,
            record_file: Mutex::new(record_file),
            record_file_len,
            block_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Looks up one key hash.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if the index slot or record
    /// file fails validation.
    pub fn get(&self, key_hash: &[u8]) -> Result<Get> {
        let indexed = self.index.get(key_hash)?;
        let slot = match indexed.value {
            Some(slot) => slot,
            None => return Ok(indexed),
        };

        let location = CurlyLocation::decode(&slot, self.options.grouped())?;
        let (value, block_cache_hit) = match location.in_block_offset {
            None => (self.read_plain_record(location.record_offset)?, false),
            Some(in_block) => self.read_grouped_record(location.record_offset, in_block)?,
        };
        Ok(Get {
            value: Some(value),
            l1_hit: indexed.l1_hit,
            l2_hit: indexed.l2_hit || block_cache_hit,
        })
    }

    /// Looks up a batch of key hashes, preserving input order.
    pub fn get_bulk(&self, key_hashes: &[Vec<u8>]) -> Result<Vec<Get>> {
        key_hashes.iter().map(|h| self.get(h)).collect()
    }

    /// Reads one length-prefixed record from a plain record file.
    fn read_plain_record(&self, offset: u64) -> Result<Vec<u8>> {
        if offset >= self.record_file_len {
            return Err(CurlyError::Corrupt(format!(
                "record offset {} beyond record file length {}",
                offset, self.record_file_len
            )));
        }
        let mut file = self.record_file.lock().map_err(|_| lock_poisoned())?;
        file.seek(SeekFrom::Start(offset))?;
        let len = varint::read(&mut *file)?;
        let end = offset + varint::varint_len(len) as u64 + len;
        if end > self.record_file_len {
            return Err(CurlyError::Corrupt(format!(
                "record of {} bytes at offset {} overruns record file length {}",
                len, offset, self.record_file_len
            )));
        }
        let mut value = vec![0u8; len as usize];
        file.read_exact(&mut value)?;
        Ok(value)
    }

    /// Reads one record out of a compressed block, via the block cache.
    /// Returns the value and whether the block came from cache.
    fn read_grouped_record(&self, block_offset: u64, in_block: u64) -> Result<(Vec<u8>, bool)> {
        let cached = {
            let cache = self.block_cache.lock().map_err(|_| lock_poisoned())?;
            cache.get(&block_offset).cloned()
        };
        let hit = cached.is_some();
        let block = match cached {
            Some(block) => block,
            None => {
                let block = Arc::new(self.load_block(block_offset)?);
                let mut cache = self.block_cache.lock().map_err(|_| lock_poisoned())?;
                if self.options.block_cache_capacity > 0 {
                    if cache.len() >= self.options.block_cache_capacity {
                        cache.clear();
                    }
                    cache.insert(block_offset, Arc::clone(&block));
                }
                block
            }
        };

        let in_block = in_block as usize;
        if in_block >= block.len() {
            return Err(CurlyError::Corrupt(format!(
                "in-block offset {} beyond block length {}",
                in_block,
                block.len()
            )));
        }
        let (len, prefix_len) = varint::decode(&block[in_block..])
            .map_err(|e| CurlyError::Corrupt(format!("bad record length prefix: {}", e)))?;
        let start = in_block + prefix_len;
        let end = start + len as usize;
        if end > block.len() {
            return Err(CurlyError::Corrupt(format!(
                "record of {} bytes at in-block offset {} overruns block length {}",
                len,
                in_block,
                block.len()
            )));
        }
        Ok((block[start..end].to_vec(), hit))
    }

    /// Reads and decompresses the record block at `block_offset`.
    fn load_block(&self, block_offset: u64) -> Result<Vec<u8>> {
        let grouping = self
            .options
            .block_grouping
            .ok_or_else(|| CurlyError::Corrupt("grouped location in ungrouped file".to_string()))?;
        if block_offset >= self.record_file_len {
            return Err(CurlyError::Corrupt(format!(
                "block offset {} beyond record file length {}",
                block_offset, self.record_file_len
            )));
        }

        let compressed = {
            let mut file = self.record_file.lock().map_err(|_| lock_poisoned())?;
            file.seek(SeekFrom::Start(block_offset))?;
            let len = varint::read(&mut *file)?;
            let end = block_offset + varint::varint_len(len) as u64 + len;
            if end > self.record_file_len {
                return Err(CurlyError::Corrupt(format!(
                    "block of {} bytes at offset {} overruns record file length {}",
                    len, block_offset, self.record_file_len
                )));
            }
            let mut compressed = vec![0u8; len as usize];
            file.read_exact(&mut compressed)?;
            compressed
        };

        // Decompression runs outside the file lock.
        Ok(grouping.codec.decompress(&compressed, grouping.target_block_size)?)
    }

    /// The underlying key-index reader, exposed for diagnostics.
    #[must_use]
    pub fn index(&self) -> &CueballReader {
        &self.index
    }
}

fn lock_poisoned() -> CurlyError {
    CurlyError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "lock poisoned",
    ))
}
