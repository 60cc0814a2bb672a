//! # Codec — integer encodings shared by both storage formats
//!
//! Two small, dependency-light building blocks:
//!
//! - [`varint`] — little-endian base-128 variable-width integers, used for
//!   record length prefixes, compressed block length prefixes, and record
//!   locations inside key-index value slots.
//! - [`HashPrefixCalculator`] — maps the leading bits of a key-hash to a
//!   bucket index. Write time and read time must agree on this mapping
//!   exactly, so it lives here rather than in either format crate.
//!
//! All multi-byte fixed-width integers elsewhere in the workspace are
//! little-endian via `byteorder`; this crate only adds the variable-width
//! form.

mod hash_prefix;
pub mod varint;

pub use hash_prefix::HashPrefixCalculator;
