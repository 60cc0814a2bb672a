use crate::error::{poisoned, CueballError, Result};
use crate::footer::Footer;
use crate::options::CueballOptions;
use codec::{varint, HashPrefixCalculator};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Outcome of one point lookup, including per-lookup cache observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Get {
    /// The value, or `None` if the key hash is absent from the file.
    pub value: Option<Vec<u8>>,
    /// `true` if the recent-lookup (L1) cache answered without touching
    /// the bucket block. Negative lookups are cached too.
    pub l1_hit: bool,
    /// `true` if the bucket block was served from the decompressed-block
    /// (L2) cache instead of disk.
    pub l2_hit: bool,
}

impl Get {
    /// Returns `true` if the key hash exists in the file.
    #[must_use]
    pub fn found(&self) -> bool {
        self.value.is_some()
    }

    fn miss(l1_hit: bool, l2_hit: bool) -> Self {
        Self {
            value: None,
            l1_hit,
            l2_hit,
        }
    }
}

/// Private per-reader caches, guarded by one lock.
///
/// Both maps are bounded by wholesale eviction: when a map reaches its
/// capacity it is cleared rather than tracked entry-by-entry. The caches are
/// scoped to one reader instance and die with it, so a version swap can
/// never serve blocks from a retired file.
struct ReaderCache {
    l1: HashMap<Vec<u8>, Option<Vec<u8>>>,
    l1_capacity: usize,
    l2: HashMap<usize, Arc<Vec<u8>>>,
    l2_capacity: usize,
}

impl ReaderCache {
    fn insert_l1(&mut self, key_hash: Vec<u8>, value: Option<Vec<u8>>) {
        if self.l1_capacity == 0 {
            return;
        }
        if self.l1.len() >= self.l1_capacity {
            self.l1.clear();
        }
        self.l1.insert(key_hash, value);
    }

    fn insert_l2(&mut self, bucket: usize, block: Arc<Vec<u8>>) {
        if self.l2_capacity == 0 {
            return;
        }
        if self.l2.len() >= self.l2_capacity {
            self.l2.clear();
        }
        self.l2.insert(bucket, block);
    }
}

/// Point-lookup reader over one immutable cueball file.
///
/// The footer is parsed once at open. Each `get` computes the bucket for
/// the key hash, loads (and caches) that bucket's block, and binary
/// searches the sorted fixed-size tuples. Concurrent `get` calls through a
/// shared reference are safe: the file handle and the caches are guarded
/// by separate mutexes, and block decompression happens outside both locks
/// so one thread's decompression cannot corrupt another's read.
pub struct CueballReader {
    #[allow(dead_code)]
    path: PathBuf,
    options: CueballOptions,
    prefix: HashPrefixCalculator,
    footer: Footer,
    file: Mutex<File>,
    cache: Mutex<ReaderCache>,
}

impl CueballReader {
    /// Opens `path` and parses its footer.
    ///
    /// # Errors
    ///
    /// Returns [`CueballError::CorruptFooter`] on any footer validation
    /// failure; such a file is never served.
    pub fn open<P: AsRef<Path>>(path: P, options: CueballOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let footer = Footer::read(&mut file, options.num_buckets())?;
        Ok(Self {
            path,
            prefix: options.prefix_calculator(),
            footer,
            file: Mutex::new(file),
            cache: Mutex::new(ReaderCache {
                l1: HashMap::new(),
                l1_capacity: options.l1_cache_capacity,
                l2: HashMap::new(),
                l2_capacity: options.l2_cache_capacity,
            }),
            options,
        })
    }

    /// Looks up one key hash.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if the bucket block fails
    /// validation (corrupt file).
    pub fn get(&self, key_hash: &[u8]) -> Result<Get> {
        if key_hash.len() != self.options.key_hash_size {
            return Err(CueballError::KeyHashSize {
                expected: self.options.key_hash_size,
                actual: key_hash.len(),
            });
        }

        let bucket = self.prefix.bucket(key_hash);
        let cached_block = {
            let cache = self.cache.lock().map_err(|_| poisoned("cache"))?;
            if let Some(value) = cache.l1.get(key_hash) {
                return Ok(Get {
                    value: value.clone(),
                    l1_hit: true,
                    l2_hit: false,
                });
            }
            cache.l2.get(&bucket).cloned()
        };

        let (start, end) = self.footer.bucket_range(bucket);
        if start == end {
            let mut cache = self.cache.lock().map_err(|_| poisoned("cache"))?;
            cache.insert_l1(key_hash.to_vec(), None);
            return Ok(Get::miss(false, false));
        }

        let l2_hit = cached_block.is_some();
        let block = match cached_block {
            Some(block) => block,
            None => {
                // Read and decompress outside the cache lock so concurrent
                // lookups of other buckets proceed unhindered.
                let block = Arc::new(self.load_block(start, end)?);
                let mut cache = self.cache.lock().map_err(|_| poisoned("cache"))?;
                cache.insert_l2(bucket, Arc::clone(&block));
                block
            }
        };

        let value = self.search_block(&block, key_hash)?;
        let mut cache = self.cache.lock().map_err(|_| poisoned("cache"))?;
        cache.insert_l1(key_hash.to_vec(), value.clone());
        Ok(Get {
            value,
            l1_hit: false,
            l2_hit,
        })
    }

    /// Looks up a batch of key hashes, preserving input order.
    pub fn get_bulk(&self, key_hashes: &[Vec<u8>]) -> Result<Vec<Get>> {
        key_hashes.iter().map(|h| self.get(h)).collect()
    }

    /// Reads the raw byte range of one bucket and decompresses it if the
    /// file's codec calls for it.
    fn load_block(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let mut raw = vec![0u8; (end - start) as usize];
        {
            let mut file = self.file.lock().map_err(|_| poisoned("file"))?;
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(&mut raw)?;
        }

        let block = if self.options.codec.is_compressed() {
            let (compressed_len, prefix_len) = varint::decode(&raw)
                .map_err(|e| CueballError::Corrupt(format!("bad block length prefix: {}", e)))?;
            let payload = &raw[prefix_len..];
            if compressed_len as usize != payload.len() {
                return Err(CueballError::Corrupt(format!(
                    "block length prefix {} does not match range {}",
                    compressed_len,
                    payload.len()
                )));
            }
            self.options
                .codec
                .decompress(payload, self.footer.max_uncompressed_block_size() as usize)?
        } else {
            raw
        };

        if block.len() % self.options.entry_size() != 0 {
            return Err(CueballError::Corrupt(format!(
                "block length {} is not a multiple of entry size {}",
                block.len(),
                self.options.entry_size()
            )));
        }
        Ok(block)
    }

    /// Binary search over the sorted fixed-size tuples of one block.
    fn search_block(&self, block: &[u8], key_hash: &[u8]) -> Result<Option<Vec<u8>>> {
        let entry_size = self.options.entry_size();
        let key_size = self.options.key_hash_size;
        let mut lo = 0usize;
        let mut hi = block.len() / entry_size;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let at = mid * entry_size;
            match block[at..at + key_size].cmp(key_hash) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => {
                    return Ok(Some(block[at + key_size..at + entry_size].to_vec()));
                }
            }
        }
        Ok(None)
    }

    /// Number of hash buckets in the underlying file.
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        self.footer.num_buckets()
    }

    /// Parsed footer, exposed for diagnostics and tests.
    #[must_use]
    pub fn footer(&self) -> &Footer {
        &self.footer
    }
}
