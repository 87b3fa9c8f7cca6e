//! Variable-length integer and length-prefixed slice codecs.

mod slice;
mod varint;

pub use slice::{decode_slice, encode_slice, encode_slice_parts, slice_parts_len};
pub use varint::{decode_uvarint, encode_uvarint, uvarint_len, MAX_VARINT_LEN};
