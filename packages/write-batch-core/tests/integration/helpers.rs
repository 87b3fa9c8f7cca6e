//! Shared helpers for integration tests.

use write_batch_core::{OwnedRecord, RecordType, WriteBatch};

/// Decodes every record of `batch`, panicking on a decode error.
pub fn decode_all(batch: &WriteBatch) -> Vec<OwnedRecord> {
    batch
        .iter()
        .map(|record| record.expect("batch built by appends must decode").to_owned_record())
        .collect()
}

/// Builds the owned record a test expects to decode.
pub fn record(
    cf: u32,
    key: Option<&[u8]>,
    value: Option<&[u8]>,
    record_type: RecordType,
) -> OwnedRecord {
    OwnedRecord {
        cf,
        key: key.map(<[u8]>::to_vec),
        value: value.map(<[u8]>::to_vec),
        record_type,
    }
}

/// Builds a serialized batch from a header count and raw body bytes.
pub fn raw_batch(count: u32, body: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 8];
    data.extend_from_slice(&count.to_le_bytes());
    data.extend_from_slice(body);
    data
}
