//! Little-endian base-128 varints.
//!
//! Seven payload bits per byte, least-significant group first; the high bit
//! of each byte marks continuation. A `u64` therefore occupies at most 10
//! bytes, and decoders reject anything longer as corrupt input.

use std::io::{self, Read, Write};

/// Maximum encoded length of a `u64` varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Returns the number of bytes `value` occupies when varint-encoded.
#[must_use]
pub fn varint_len(value: u64) -> usize {
    let mut v = value;
    let mut len = 1;
    while v >= 0x80 {
        v >>= 7;
        len += 1;
    }
    len
}

/// Appends the varint encoding of `value` to `buf`.
pub fn encode(value: u64, buf: &mut Vec<u8>) {
    let mut v = value;
    while v >= 0x80 {
        buf.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Writes the varint encoding of `value` to `w`, returning the number of
/// bytes written.
pub fn write<W: Write>(w: &mut W, value: u64) -> io::Result<usize> {
    let mut scratch = [0u8; MAX_VARINT_LEN];
    let mut v = value;
    let mut n = 0;
    while v >= 0x80 {
        scratch[n] = (v as u8 & 0x7f) | 0x80;
        v >>= 7;
        n += 1;
    }
    scratch[n] = v as u8;
    n += 1;
    w.write_all(&scratch[..n])?;
    Ok(n)
}

/// Reads one varint from `r`.
///
/// # Errors
///
/// Returns `InvalidData` if the encoding runs past 10 bytes (corrupt or
/// non-canonical input), or any underlying I/O error (including
/// `UnexpectedEof` on truncation).
pub fn read<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)?;
        let b = byte[0];
        if shift >= 63 && b > 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "varint overflows u64",
            ));
        }
        result |= u64::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint too long"));
        }
    }
}

/// Decodes one varint from the front of `buf`, returning `(value, bytes
/// consumed)`.
///
/// # Errors
///
/// Returns `InvalidData` on truncated or over-long encodings.
pub fn decode(buf: &[u8]) -> io::Result<(u64, usize)> {
    let mut cursor = buf;
    let before = cursor.len();
    let value = read(&mut cursor)?;
    Ok((value, before - cursor.len()))
}
