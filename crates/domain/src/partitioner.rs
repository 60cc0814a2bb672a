use crc32fast::Hasher;

/// Maps a key to the partition that owns it.
///
/// Builders and the serving tier must agree on the partitioner, so
/// implementations must be pure functions of the key bytes.
pub trait Partitioner: Send + Sync {
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize;
}

/// Default partitioner: CRC32 of the key modulo the partition count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Partitioner;

impl Partitioner for Crc32Partitioner {
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize {
        let mut hasher = Hasher::new();
        hasher.update(key);
        hasher.finalize() as usize % num_partitions.max(1)
    }
}

/// Derives the fixed-width key hash that all sorting and bucketing
/// operates on. Write time and read time must use the same hasher.
pub trait KeyHasher: Send + Sync {
    /// Hashes `key` to exactly `width` bytes.
    fn hash(&self, key: &[u8], width: usize) -> Vec<u8>;
}

/// Default key hasher: seeded CRC32 rounds.
///
/// Each 4-byte chunk of the output comes from a CRC32 round seeded with
/// its chunk index, so widths beyond four bytes do not just repeat the
/// same word.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32KeyHasher;

impl KeyHasher for Crc32KeyHasher {
    fn hash(&self, key: &[u8], width: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(width);
        let mut round = 0u32;
        while out.len() < width {
            let mut hasher = Hasher::new_with_initial(round);
            hasher.update(key);
            let word = hasher.finalize().to_be_bytes();
            let take = (width - out.len()).min(4);
            out.extend_from_slice(&word[..take]);
            round += 1;
        }
        out
    }
}
