//! Hash-prefix bucket calculator.
//!
//! A fixed-value-size file is partitioned into `2^bits` buckets addressed by
//! the top `bits` bits of the key-hash. The writer uses this to decide which
//! block an entry belongs to and the reader uses it to locate that block, so
//! the two sides must compute identical values for every hash.

/// Extracts the top `bits` bits of a key-hash's leading bytes.
///
/// For `bits <= 8` the first byte is right-shifted; for wider prefixes the
/// first `ceil(bits / 8)` bytes are combined big-endian into an integer and
/// right-shifted so exactly `bits` bits remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPrefixCalculator {
    bits: u32,
    /// Number of leading hash bytes that participate in the prefix.
    prefix_bytes: usize,
    /// Right-shift applied after combining the leading bytes.
    shift: u32,
}

impl HashPrefixCalculator {
    /// Creates a calculator for `bits`-wide prefixes.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is zero or larger than 32 (a bucket index must fit
    /// comfortably in `usize` and footers become absurd long before then).
    #[must_use]
    pub fn new(bits: u32) -> Self {
        assert!(bits >= 1 && bits <= 32, "hash index bits must be in 1..=32");
        let prefix_bytes = ((bits + 7) / 8) as usize;
        let shift = (prefix_bytes as u32) * 8 - bits;
        Self {
            bits,
            prefix_bytes,
            shift,
        }
    }

    /// Returns the prefix width in bits.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns the number of buckets this prefix width addresses (`2^bits`).
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        1usize << self.bits
    }

    /// Returns the bucket index for `key_hash`.
    ///
    /// # Panics
    ///
    /// Panics if the hash is shorter than the prefix width requires. The
    /// hash width is fixed per domain configuration, so a short hash is a
    /// caller bug, not a data error.
    #[must_use]
    pub fn bucket(&self, key_hash: &[u8]) -> usize {
        assert!(
            key_hash.len() >= self.prefix_bytes,
            "key hash shorter than hash prefix ({} < {})",
            key_hash.len(),
            self.prefix_bytes
        );
        let mut combined: u64 = 0;
        for &b in &key_hash[..self.prefix_bytes] {
            combined = (combined << 8) | u64::from(b);
        }
        (combined >> self.shift) as usize
    }
}
