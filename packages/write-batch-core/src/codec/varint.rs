use crate::error::{BatchError, Result};

/// Longest encoding of a `u64`: ten groups of seven bits.
pub const MAX_VARINT_LEN: usize = 10;

/// Appends the base-128 encoding of `n` to `dst`, low group first.
///
/// # Returns
/// Number of bytes written (1..=10).
pub fn encode_uvarint(mut n: u64, dst: &mut Vec<u8>) -> usize {
    let start = dst.len();
    while n >= 0x80 {
        dst.push((n as u8 & 0x7F) | 0x80);
        n >>= 7;
    }
    dst.push(n as u8);
    dst.len() - start
}

/// Returns the number of bytes `encode_uvarint` writes for `n`.
pub fn uvarint_len(mut n: u64) -> usize {
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

/// Decodes a varint from the front of `buf`.
///
/// # Returns
/// `(value, consumed)` on success.
///
/// # Errors
/// - `ShortBuffer` if `buf` ends before a terminating byte is seen
/// - `MalformedVarint` if ten bytes carry the continuation bit
pub fn decode_uvarint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(BatchError::MalformedVarint)
    } else {
        Err(BatchError::ShortBuffer)
    }
}
