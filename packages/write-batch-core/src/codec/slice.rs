use crate::error::{BatchError, Result};

use super::varint::{decode_uvarint, encode_uvarint, uvarint_len};

/// Appends `bytes` to `dst` prefixed with its varint length.
pub fn encode_slice(bytes: &[u8], dst: &mut Vec<u8>) {
    encode_uvarint(bytes.len() as u64, dst);
    dst.extend_from_slice(bytes);
}

/// Appends the concatenation of `parts` as a single length-prefixed slice.
///
/// Produces the same bytes as `encode_slice` over the joined fragments.
pub fn encode_slice_parts(parts: &[&[u8]], dst: &mut Vec<u8>) {
    let total: usize = parts.iter().map(|part| part.len()).sum();
    encode_uvarint(total as u64, dst);
    for part in parts {
        dst.extend_from_slice(part);
    }
}

/// Encoded size of `parts` as one length-prefixed slice.
pub fn slice_parts_len(parts: &[&[u8]]) -> usize {
    let total: usize = parts.iter().map(|part| part.len()).sum();
    uvarint_len(total as u64) + total
}

/// Splits a length-prefixed slice off the front of `buf`.
///
/// # Returns
/// `(slice, rest)`, both borrowed from `buf`.
///
/// # Errors
/// `ShortBuffer` if the declared length exceeds the bytes after the prefix,
/// or any error from decoding the prefix itself.
pub fn decode_slice(buf: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, consumed) = decode_uvarint(buf)?;
    let rest = &buf[consumed..];
    let len = usize::try_from(len).map_err(|_| BatchError::ShortBuffer)?;
    if len > rest.len() {
        return Err(BatchError::ShortBuffer);
    }
    Ok(rest.split_at(len))
}
