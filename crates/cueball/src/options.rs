use codec::HashPrefixCalculator;
use compress::BlockCodec;

/// Geometry and codec configuration for one cueball file.
///
/// The same options must be used to write and to read a file: key-hash and
/// value widths, the hash-index width, and the block codec are all part of
/// the on-disk contract and are carried by the domain configuration rather
/// than the file itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueballOptions {
    /// Width of every key hash in bytes (>= 1).
    pub key_hash_size: usize,
    /// Width of every value in bytes (>= 1).
    pub value_size: usize,
    /// Hash-prefix width in bits; the file has `2^bits` buckets.
    pub hash_index_bits: u32,
    /// Per-bucket block codec.
    pub codec: BlockCodec,
    /// Capacity of the reader's recent-lookup (L1) cache, in entries.
    pub l1_cache_capacity: usize,
    /// Capacity of the reader's decompressed-block (L2) cache, in blocks.
    pub l2_cache_capacity: usize,
}

impl CueballOptions {
    /// Creates options with no compression and default cache capacities.
    ///
    /// # Panics
    ///
    /// Panics if either width is zero; zero-width tuples cannot be indexed.
    #[must_use]
    pub fn new(key_hash_size: usize, value_size: usize, hash_index_bits: u32) -> Self {
        assert!(key_hash_size >= 1, "key hash size must be at least 1 byte");
        assert!(value_size >= 1, "value size must be at least 1 byte");
        Self {
            key_hash_size,
            value_size,
            hash_index_bits,
            codec: BlockCodec::None,
            l1_cache_capacity: 1024,
            l2_cache_capacity: 64,
        }
    }

    /// Replaces the block codec.
    #[must_use]
    pub fn with_codec(mut self, codec: BlockCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Replaces the reader cache capacities.
    #[must_use]
    pub fn with_cache_capacities(mut self, l1: usize, l2: usize) -> Self {
        self.l1_cache_capacity = l1;
        self.l2_cache_capacity = l2;
        self
    }

    /// Bytes occupied by one `(key hash, value)` tuple.
    #[must_use]
    pub fn entry_size(&self) -> usize {
        self.key_hash_size + self.value_size
    }

    /// Number of hash buckets (`2^hash_index_bits`).
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        1usize << self.hash_index_bits
    }

    /// Builds the prefix calculator for this geometry.
    #[must_use]
    pub fn prefix_calculator(&self) -> HashPrefixCalculator {
        HashPrefixCalculator::new(self.hash_index_bits)
    }
}
