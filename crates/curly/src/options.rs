use compress::BlockCodec;
use cueball::CueballOptions;

/// Record block grouping configuration.
///
/// When set, records are packed into blocks of roughly
/// `target_block_size` uncompressed bytes, each stored compressed with
/// `codec`, and index slots carry `(block offset, in-block offset)`
/// locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrouping {
    pub codec: BlockCodec,
    pub target_block_size: usize,
}

/// Configuration for one curly version (record file + key index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlyOptions {
    /// Geometry of the key index. Its `value_size` is the width of the
    /// location slot and must be large enough for the varint-encoded
    /// location of the last record in the file.
    pub index: CueballOptions,
    /// Optional compressed record blocks.
    pub block_grouping: Option<BlockGrouping>,
    /// Reuse the location of a byte-identical value written earlier in
    /// the same session instead of re-appending it.
    pub value_folding: bool,
    /// Capacity of the reader's decompressed record-block cache, in
    /// blocks. Only used with block grouping.
    pub block_cache_capacity: usize,
}

impl CurlyOptions {
    /// Creates options with no grouping and no folding.
    #[must_use]
    pub fn new(key_hash_size: usize, location_size: usize, hash_index_bits: u32) -> Self {
        Self {
            index: CueballOptions::new(key_hash_size, location_size, hash_index_bits),
            block_grouping: None,
            value_folding: false,
            block_cache_capacity: 64,
        }
    }

    /// Enables record block grouping.
    #[must_use]
    pub fn with_block_grouping(mut self, codec: BlockCodec, target_block_size: usize) -> Self {
        self.block_grouping = Some(BlockGrouping {
            codec,
            target_block_size,
        });
        self
    }

    /// Enables value folding.
    #[must_use]
    pub fn with_value_folding(mut self) -> Self {
        self.value_folding = true;
        self
    }

    /// Replaces the key index codec.
    #[must_use]
    pub fn with_index_codec(mut self, codec: BlockCodec) -> Self {
        self.index = self.index.with_codec(codec);
        self
    }

    /// Returns `true` when records are grouped into compressed blocks.
    #[must_use]
    pub fn grouped(&self) -> bool {
        self.block_grouping.is_some()
    }

    /// Width of the key index's location slot.
    #[must_use]
    pub fn location_size(&self) -> usize {
        self.index.value_size
    }
}
