//! Save point and rollback behavior.

use ntest::timeout;

use write_batch_core::{BatchError, WriteBatch};

use super::helpers::decode_all;

#[timeout(1000)]
#[test]
fn test_rollback_without_save_point_is_not_found() {
    let mut batch = WriteBatch::new();
    batch.put(b"k", b"v").unwrap();
    let before = batch.data().to_vec();

    assert_eq!(batch.rollback_to_save_point(), Err(BatchError::NotFound));
    assert_eq!(batch.data(), &before[..]);
    assert_eq!(batch.count(), 1);
}

#[timeout(1000)]
#[test]
fn test_count_after_rollback() {
    let mut batch = WriteBatch::new();
    for i in 0..4u8 {
        batch.put(&[i], b"v").unwrap();
    }
    batch.set_save_point();
    for i in 4..10u8 {
        batch.put(&[i], b"v").unwrap();
    }
    assert_eq!(batch.count(), 10);

    batch.rollback_to_save_point().unwrap();
    assert_eq!(batch.count(), 4);
    assert_eq!(decode_all(&batch).len(), 4);
}

#[timeout(1000)]
#[test]
fn test_nested_save_points_roll_back_lifo() {
    let mut batch = WriteBatch::new();
    batch.put(b"a", b"1").unwrap();
    batch.set_save_point();
    batch.put(b"b", b"2").unwrap();
    let after_b = batch.data().to_vec();
    batch.set_save_point();
    batch.put(b"c", b"3").unwrap();
    batch.delete(b"a").unwrap();
    assert_eq!(batch.save_point_depth(), 2);

    batch.rollback_to_save_point().unwrap();
    assert_eq!(batch.data(), &after_b[..]);
    assert_eq!(batch.count(), 2);

    batch.rollback_to_save_point().unwrap();
    assert_eq!(batch.count(), 1);
    assert_eq!(batch.save_point_depth(), 0);
    assert_eq!(batch.rollback_to_save_point(), Err(BatchError::NotFound));
}

#[timeout(1000)]
#[test]
fn test_append_after_rollback_matches_fresh_batch() {
    let mut rolled = WriteBatch::new();
    rolled.put(b"a", b"1").unwrap();
    rolled.set_save_point();
    rolled.merge(b"b", b"discarded").unwrap();
    rolled.put_log_data(b"discarded").unwrap();
    rolled.rollback_to_save_point().unwrap();
    rolled.delete(b"c").unwrap();

    let mut fresh = WriteBatch::new();
    fresh.put(b"a", b"1").unwrap();
    fresh.delete(b"c").unwrap();

    assert_eq!(rolled.data(), fresh.data());
}

#[timeout(1000)]
#[test]
fn test_rollback_keeps_earlier_save_points() {
    let mut batch = WriteBatch::new();
    batch.set_save_point();
    batch.put(b"a", b"1").unwrap();
    batch.set_save_point();
    batch.put(b"b", b"2").unwrap();

    let inner = batch.rollback_to_save_point().unwrap();
    assert_eq!(inner.count, 1);
    assert_eq!(batch.save_point_depth(), 1);

    batch.put(b"c", b"3").unwrap();
    let outer = batch.rollback_to_save_point().unwrap();
    assert_eq!(outer.count, 0);
    assert!(batch.is_empty());
}

#[timeout(1000)]
#[test]
fn test_rollback_after_clear_is_rejected() {
    let mut batch = WriteBatch::new();
    batch.put(b"a", b"1").unwrap();
    batch.set_save_point();
    batch.put(b"b", b"2").unwrap();
    batch.clear();

    assert_eq!(batch.rollback_to_save_point(), Err(BatchError::NotFound));
    assert_eq!(batch.count(), 0);
}

#[timeout(1000)]
#[test]
fn test_rollback_to_empty_save_point() {
    let mut batch = WriteBatch::new();
    batch.set_save_point();
    batch.put(b"a", b"1").unwrap();
    batch.rollback_to_save_point().unwrap();
    assert_eq!(batch.data(), WriteBatch::new().data());
}
