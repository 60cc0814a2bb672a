use crate::error::{CurlyError, Result};
use codec::varint;

/// Position of one record inside a curly record file.
///
/// In a plain file this is a byte offset to the record's length prefix.
/// With block grouping it is the byte offset of the compressed block plus
/// the record's offset inside the decompressed block.
///
/// A location is stored varint-encoded in the key index's fixed-width
/// value slot, zero-padded on the right; decoding reads the expected
/// number of varints and ignores the padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlyLocation {
    /// Offset of the record (plain) or of its block (grouped) in the
    /// record file.
    pub record_offset: u64,
    /// Offset of the record inside the decompressed block; `None` for
    /// plain files.
    pub in_block_offset: Option<u64>,
}

impl CurlyLocation {
    /// A location in a plain (ungrouped) record file.
    #[must_use]
    pub fn direct(record_offset: u64) -> Self {
        Self {
            record_offset,
            in_block_offset: None,
        }
    }

    /// A location inside a compressed record block.
    #[must_use]
    pub fn grouped(block_offset: u64, in_block_offset: u64) -> Self {
        Self {
            record_offset: block_offset,
            in_block_offset: Some(in_block_offset),
        }
    }

    /// Encodes this location into a fresh slot of `slot_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CurlyError::LocationOverflow`] when the varint encoding
    /// does not fit; the slot width is fixed per domain configuration and
    /// silently truncating an offset would corrupt the index.
    pub fn encode(&self, slot_size: usize) -> Result<Vec<u8>> {
        let mut slot = Vec::with_capacity(slot_size);
        varint::encode(self.record_offset, &mut slot);
        if let Some(in_block) = self.in_block_offset {
            varint::encode(in_block, &mut slot);
        }
        if slot.len() > slot_size {
            return Err(CurlyError::LocationOverflow {
                offset: self.record_offset,
                slot_size,
            });
        }
        slot.resize(slot_size, 0);
        Ok(slot)
    }

    /// Decodes a location from an index value slot.
    ///
    /// # Errors
    ///
    /// Returns [`CurlyError::Corrupt`] if the slot does not hold the
    /// expected varints.
    pub fn decode(slot: &[u8], grouped: bool) -> Result<Self> {
        let (record_offset, consumed) = varint::decode(slot)
            .map_err(|e| CurlyError::Corrupt(format!("bad location slot: {}", e)))?;
        if !grouped {
            return Ok(Self::direct(record_offset));
        }
        let (in_block_offset, _) = varint::decode(&slot[consumed..])
            .map_err(|e| CurlyError::Corrupt(format!("bad grouped location slot: {}", e)))?;
        Ok(Self::grouped(record_offset, in_block_offset))
    }
}
