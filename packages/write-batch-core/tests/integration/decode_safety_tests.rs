//! Decoding truncated, corrupted and random input.

use ntest::timeout;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};

use write_batch_core::codec::{decode_slice, decode_uvarint, encode_uvarint};
use write_batch_core::{BatchError, BatchIterator, WriteBatch};

use super::helpers::raw_batch;

/// Returns `true` if `inner` lies entirely within `outer`.
fn within(outer: &[u8], inner: &[u8]) -> bool {
    let outer = outer.as_ptr_range();
    let inner = inner.as_ptr_range();
    outer.start <= inner.start && inner.end <= outer.end
}

fn is_decode_error(err: &BatchError) -> bool {
    matches!(
        err,
        BatchError::ShortBuffer | BatchError::MalformedVarint | BatchError::UnsupportedRecordType(_)
    )
}

#[timeout(1000)]
#[test]
fn test_overlong_slice_never_reads_past_input() {
    // Guard bytes after the visible input must not be picked up.
    let backing = [0x05, b'a', b'b', 0xEE, 0xEE, 0xEE, 0xEE];
    let input = &backing[..3];
    assert_eq!(decode_slice(input), Err(BatchError::ShortBuffer));

    let input = &backing[..6];
    let (slice, rest) = decode_slice(input).unwrap();
    assert_eq!(slice, &[b'a', b'b', 0xEE, 0xEE, 0xEE]);
    assert!(within(input, slice));
    assert!(rest.is_empty());
}

#[timeout(1000)]
#[test]
fn test_decoded_records_borrow_from_body() {
    let mut batch = WriteBatch::new();
    batch.put(b"key", b"value").unwrap();
    batch.put_log_data(b"blob").unwrap();
    let body = batch.body();
    for record in BatchIterator::new(body) {
        let record = record.unwrap();
        for field in [record.key, record.value].into_iter().flatten() {
            assert!(within(body, field));
        }
    }
}

#[timeout(1000)]
#[test]
fn test_varint_truncation_and_overflow() {
    let mut buf = Vec::new();
    encode_uvarint(1 << 40, &mut buf);
    assert_eq!(decode_uvarint(&buf[..buf.len() - 1]), Err(BatchError::ShortBuffer));
    assert_eq!(decode_uvarint(&[0x80; 10]), Err(BatchError::MalformedVarint));
}

#[timeout(1000)]
#[test]
fn test_every_truncation_of_valid_batch_fails_closed() {
    let mut batch = WriteBatch::new();
    batch.put_cf(300, b"key", b"value").unwrap();
    batch.delete_range(b"a", b"z").unwrap();
    batch.mark_commit(b"xid").unwrap();
    let body = batch.body();

    let record_ends = {
        let mut ends = Vec::new();
        let mut iter = BatchIterator::new(body);
        while let Some(record) = iter.next() {
            record.unwrap();
            ends.push(iter.offset());
        }
        ends
    };

    for cut in 0..body.len() {
        let mut iter = BatchIterator::new(&body[..cut]);
        let decoded = iter.by_ref().filter(Result::is_ok).count();
        let whole = record_ends.iter().filter(|&&end| end <= cut).count();
        assert_eq!(decoded, whole, "cut at {}", cut);
        if record_ends.contains(&cut) || cut == 0 {
            assert!(iter.error().is_none(), "cut at {}", cut);
        } else {
            assert_eq!(iter.error(), Some(&BatchError::ShortBuffer), "cut at {}", cut);
        }
    }
}

#[timeout(1000)]
#[test]
fn test_from_data_then_validate_rejects_garbage() {
    let data = raw_batch(1, &[0x01, 0x03, b'k']);
    let batch = WriteBatch::from_data(&data).unwrap();
    assert_eq!(batch.validate(), Err(BatchError::ShortBuffer));
}

#[timeout(5000)]
#[test]
fn test_seeded_random_bodies_terminate() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    for _ in 0..2_000 {
        let len = rng.gen_range(0..64);
        let body: Vec<u8> = (0..len).map(|_| rng.gen_range(0..0x14)).collect();
        let data = raw_batch(0, &body);

        let mut iter = BatchIterator::over_batch_data(&data);
        let mut steps = 0;
        for record in iter.by_ref() {
            steps += 1;
            if let Err(err) = record {
                assert!(is_decode_error(&err));
            }
        }
        assert!(steps <= body.len());
    }
}

proptest! {
    #[test]
    fn prop_random_bytes_never_panic(body in proptest::collection::vec(any::<u8>(), 0..256)) {
        let data = raw_batch(7, &body);
        let mut iter = BatchIterator::over_batch_data(&data);
        let mut records = 0usize;
        let mut errors = 0usize;
        for record in iter.by_ref() {
            match record {
                Ok(_) => records += 1,
                Err(err) => {
                    prop_assert!(is_decode_error(&err));
                    errors += 1;
                }
            }
        }
        prop_assert!(errors <= 1);
        prop_assert!(records + errors <= body.len());
        prop_assert_eq!(errors == 1, iter.error().is_some());
        prop_assert!(iter.next().is_none());
    }
}
