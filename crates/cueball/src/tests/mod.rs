
use crate::CueballOptions;

/// Small geometry used across the test modules: 2-byte hashes, 4-byte
/// values, 4 buckets.
pub fn small_options() -> CueballOptions {
    CueballOptions::new(2, 4, 2)
}

/// Builds a fixed-width key hash from a u16, big-endian so numeric order
/// matches byte order.
pub fn hash2(n: u16) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

/// Builds a 4-byte value from a u32.
pub fn val4(n: u32) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}
