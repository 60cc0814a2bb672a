//! # Compress — block compression codecs
//!
//! Both storage formats optionally compress blocks (a cueball bucket block,
//! or a curly record-group block) with a codec chosen by the domain
//! configuration. The codec is part of the on-disk contract: a file written
//! with one codec must be read back with the same one, so configurations
//! carry the codec by name.
//!
//! Supported codecs:
//!
//! | Name      | Backing                     |
//! |-----------|-----------------------------|
//! | `none`    | pass-through                |
//! | `deflate` | `flate2` raw DEFLATE        |
//! | `gzip`    | `flate2` gzip container     |
//! | `snappy`  | `snap` raw Snappy           |

use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors raised while compressing or decompressing a block.
#[derive(Debug, Error)]
pub enum CompressError {
    /// An underlying I/O error from a flate2 encoder/decoder.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A snappy encode/decode failure (truncated or corrupt block).
    #[error("snappy error: {0}")]
    Snappy(#[from] snap::Error),

    /// A codec name not in the supported set.
    #[error("unknown compression codec: {0}")]
    UnknownCodec(String),
}

/// A block compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockCodec {
    /// No compression; blocks are stored raw.
    #[default]
    None,
    /// Raw DEFLATE streams.
    Deflate,
    /// Gzip-framed DEFLATE.
    Gzip,
    /// Raw Snappy.
    Snappy,
}

impl BlockCodec {
    /// Resolves a codec from its configuration name.
    ///
    /// # Errors
    ///
    /// Returns [`CompressError::UnknownCodec`] for unrecognized names.
    pub fn from_name(name: &str) -> Result<Self, CompressError> {
        match name {
            "none" => Ok(BlockCodec::None),
            "deflate" => Ok(BlockCodec::Deflate),
            "gzip" => Ok(BlockCodec::Gzip),
            "snappy" => Ok(BlockCodec::Snappy),
            other => Err(CompressError::UnknownCodec(other.to_string())),
        }
    }

    /// Returns the configuration name of this codec.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BlockCodec::None => "none",
            BlockCodec::Deflate => "deflate",
            BlockCodec::Gzip => "gzip",
            BlockCodec::Snappy => "snappy",
        }
    }

    /// Returns `true` when this codec actually transforms bytes.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        !matches!(self, BlockCodec::None)
    }

    /// Compresses `raw` into a fresh buffer.
    pub fn compress(&self, raw: &[u8]) -> Result<Vec<u8>, CompressError> {
        match self {
            BlockCodec::None => Ok(raw.to_vec()),
            BlockCodec::Deflate => {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(raw)?;
                Ok(enc.finish()?)
            }
            BlockCodec::Gzip => {
                let mut enc = GzEncoder::new(Vec::new(), Compression::default());
                enc.write_all(raw)?;
                Ok(enc.finish()?)
            }
            BlockCodec::Snappy => Ok(snap::raw::Encoder::new().compress_vec(raw)?),
        }
    }

    /// Decompresses `block` into a fresh buffer.
    ///
    /// `uncompressed_hint` sizes the output buffer up front (the footer's
    /// max-uncompressed-block-size makes a good hint); it is advisory only.
    pub fn decompress(
        &self,
        block: &[u8],
        uncompressed_hint: usize,
    ) -> Result<Vec<u8>, CompressError> {
        match self {
            BlockCodec::None => Ok(block.to_vec()),
            BlockCodec::Deflate => {
                let mut out = Vec::with_capacity(uncompressed_hint);
                DeflateDecoder::new(block).read_to_end(&mut out)?;
                Ok(out)
            }
            BlockCodec::Gzip => {
                let mut out = Vec::with_capacity(uncompressed_hint);
                GzDecoder::new(block).read_to_end(&mut out)?;
                Ok(out)
            }
            BlockCodec::Snappy => Ok(snap::raw::Decoder::new().decompress_vec(block)?),
        }
    }
}
