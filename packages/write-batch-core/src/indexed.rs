//! Write batch with a searchable index over its queued keys.
//!
//! Lookups answer from the batch alone: the latest queued record touching a
//! key decides the result, so a caller can read its own pending writes
//! before the batch is applied. The index is kept in step with the buffer
//! on every append, rollback and clear.

use std::collections::BTreeMap;

use crate::batch::{BatchIterator, SavePoint, WriteBatch};
use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::record::{RecordType, DEFAULT_COLUMN_FAMILY};

/// Result of looking a key up in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Latest record is a put, merge or blob index carrying this value
    Found(Vec<u8>),
    /// Latest record is a deletion, or a range deletion covers the key
    Deleted,
    /// Nothing in the batch touches the key
    NotInBatch,
}

/// Range deletion `[begin, end)` queued at a body offset.
#[derive(Debug, Clone)]
struct RangeTombstone {
    cf: u32,
    begin: Vec<u8>,
    end: Vec<u8>,
    offset: usize,
}

impl RangeTombstone {
    fn covers(&self, cf: u32, key: &[u8]) -> bool {
        self.cf == cf && self.begin.as_slice() <= key && key < self.end.as_slice()
    }
}

/// Body offsets of the records touching each key, ascending.
#[derive(Debug, Clone, Default)]
struct BatchIndex {
    points: BTreeMap<u32, BTreeMap<Vec<u8>, Vec<usize>>>,
    ranges: Vec<RangeTombstone>,
    overwrite_key: bool,
}

impl BatchIndex {
    fn new(overwrite_key: bool) -> Self {
        Self {
            points: BTreeMap::new(),
            ranges: Vec::new(),
            overwrite_key,
        }
    }

    /// Indexes every record already present in `body`.
    fn build(body: &[u8], overwrite_key: bool) -> Result<Self> {
        let mut index = Self::new(overwrite_key);
        let mut iter = BatchIterator::new(body);
        loop {
            let offset = iter.offset();
            let Some(record) = iter.next() else {
                break;
            };
            let record = record?;
            let key = record.key.unwrap_or_default();
            if matches!(
                record.record_type,
                RecordType::RangeDeletion | RecordType::ColumnFamilyRangeDeletion
            ) {
                index.track_range(record.cf, key, record.value.unwrap_or_default(), offset);
            } else if record.record_type.is_data() {
                index.track_point(record.cf, key, offset);
            }
        }
        Ok(index)
    }

    fn track_point(&mut self, cf: u32, key: &[u8], offset: usize) {
        let offsets = self
            .points
            .entry(cf)
            .or_default()
            .entry(key.to_vec())
            .or_default();
        if self.overwrite_key {
            offsets.clear();
        }
        offsets.push(offset);
    }

    fn track_range(&mut self, cf: u32, begin: &[u8], end: &[u8], offset: usize) {
        self.ranges.push(RangeTombstone {
            cf,
            begin: begin.to_vec(),
            end: end.to_vec(),
            offset,
        });
    }

    /// Forgets every record at or past `body_len`.
    fn truncate(&mut self, body_len: usize) {
        for keys in self.points.values_mut() {
            keys.retain(|_, offsets| {
                let keep = offsets.partition_point(|&offset| offset < body_len);
                offsets.truncate(keep);
                !offsets.is_empty()
            });
        }
        self.points.retain(|_, keys| !keys.is_empty());
        self.ranges.retain(|range| range.offset < body_len);
    }

    fn clear(&mut self) {
        self.points.clear();
        self.ranges.clear();
    }

    fn latest_point(&self, cf: u32, key: &[u8]) -> Option<usize> {
        self.points.get(&cf)?.get(key)?.last().copied()
    }

    fn latest_range(&self, cf: u32, key: &[u8]) -> Option<usize> {
        self.ranges
            .iter()
            .rev()
            .find(|range| range.covers(cf, key))
            .map(|range| range.offset)
    }
}

/// A `WriteBatch` plus an index answering read-your-own-writes lookups.
#[derive(Debug, Clone)]
pub struct WriteBatchWithIndex {
    batch: WriteBatch,
    index: BatchIndex,
}

impl Default for WriteBatchWithIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatchWithIndex {
    pub fn new() -> Self {
        Self::with_config(BatchConfig::default())
    }

    /// Creates an empty indexed batch. `config.overwrite_key` selects whether
    /// the index keeps only the latest entry per key.
    pub fn with_config(config: BatchConfig) -> Self {
        let index = BatchIndex::new(config.overwrite_key);
        Self {
            batch: WriteBatch::with_config(config),
            index,
        }
    }

    /// Indexes an existing batch.
    ///
    /// # Errors
    /// The first decode error in the batch body.
    pub fn from_batch(batch: WriteBatch) -> Result<Self> {
        let index = BatchIndex::build(batch.body(), batch.config().overwrite_key)?;
        Ok(Self { batch, index })
    }

    /// Resolves `key` in column family `cf` against the queued records.
    ///
    /// The record with the greatest body offset wins; a covering range
    /// deletion counts as a deletion at its own offset.
    pub fn get(&self, cf: u32, key: &[u8]) -> Result<Lookup> {
        let point = self.index.latest_point(cf, key);
        let range = self.index.latest_range(cf, key);
        match (point, range) {
            (Some(point), Some(range)) if range > point => Ok(Lookup::Deleted),
            (Some(point), _) => self.lookup_at(point),
            (None, Some(_)) => Ok(Lookup::Deleted),
            (None, None) => Ok(Lookup::NotInBatch),
        }
    }

    /// `get` in the default column family.
    pub fn get_default(&self, key: &[u8]) -> Result<Lookup> {
        self.get(DEFAULT_COLUMN_FAMILY, key)
    }

    fn lookup_at(&self, offset: usize) -> Result<Lookup> {
        let body = self.batch.body().get(offset..).ok_or(BatchError::ShortBuffer)?;
        let record = BatchIterator::new(body)
            .next()
            .ok_or(BatchError::ShortBuffer)??;
        use RecordType::*;
        match record.record_type {
            Value | ColumnFamilyValue | Merge | ColumnFamilyMerge | BlobIndex
            | ColumnFamilyBlobIndex => Ok(Lookup::Found(
                record.value.unwrap_or_default().to_vec(),
            )),
            Deletion | ColumnFamilyDeletion | SingleDeletion | ColumnFamilySingleDeletion => {
                Ok(Lookup::Deleted)
            }
            other => Err(BatchError::UnsupportedRecordType(other.tag())),
        }
    }

    /// Returns the indexed point entries of `cf` in key order.
    ///
    /// With `overwrite_key` each key appears once, for its latest record;
    /// otherwise every queued record appears, oldest first within a key.
    /// Range deletions are not applied to these entries.
    pub fn entries_cf(&self, cf: u32) -> Result<Vec<(&[u8], Lookup)>> {
        let Some(keys) = self.index.points.get(&cf) else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::new();
        for (key, offsets) in keys {
            for &offset in offsets {
                entries.push((key.as_slice(), self.lookup_at(offset)?));
            }
        }
        Ok(entries)
    }

    fn track_point<F>(&mut self, cf: u32, key: &[u8], append: F) -> Result<()>
    where
        F: FnOnce(&mut WriteBatch) -> Result<()>,
    {
        let offset = self.batch.body().len();
        append(&mut self.batch)?;
        self.index.track_point(cf, key, offset);
        Ok(())
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_cf(DEFAULT_COLUMN_FAMILY, key, value)
    }

    pub fn put_cf(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        self.track_point(cf, key, |batch| batch.put_cf(cf, key, value))
    }

    pub fn put_v(&mut self, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        self.put_v_cf(DEFAULT_COLUMN_FAMILY, keys, values)
    }

    pub fn put_v_cf(&mut self, cf: u32, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        let key = keys.concat();
        self.track_point(cf, &key, |batch| batch.put_v_cf(cf, keys, values))
    }

    pub fn merge(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.merge_cf(DEFAULT_COLUMN_FAMILY, key, value)
    }

    pub fn merge_cf(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        self.track_point(cf, key, |batch| batch.merge_cf(cf, key, value))
    }

    pub fn merge_v(&mut self, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        self.merge_v_cf(DEFAULT_COLUMN_FAMILY, keys, values)
    }

    pub fn merge_v_cf(&mut self, cf: u32, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        let key = keys.concat();
        self.track_point(cf, &key, |batch| batch.merge_v_cf(cf, keys, values))
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.delete_cf(DEFAULT_COLUMN_FAMILY, key)
    }

    pub fn delete_cf(&mut self, cf: u32, key: &[u8]) -> Result<()> {
        self.track_point(cf, key, |batch| batch.delete_cf(cf, key))
    }

    pub fn delete_v(&mut self, keys: &[&[u8]]) -> Result<()> {
        self.delete_v_cf(DEFAULT_COLUMN_FAMILY, keys)
    }

    pub fn delete_v_cf(&mut self, cf: u32, keys: &[&[u8]]) -> Result<()> {
        let key = keys.concat();
        self.track_point(cf, &key, |batch| batch.delete_v_cf(cf, keys))
    }

    pub fn single_delete(&mut self, key: &[u8]) -> Result<()> {
        self.single_delete_cf(DEFAULT_COLUMN_FAMILY, key)
    }

    pub fn single_delete_cf(&mut self, cf: u32, key: &[u8]) -> Result<()> {
        self.track_point(cf, key, |batch| batch.single_delete_cf(cf, key))
    }

    pub fn delete_range(&mut self, begin: &[u8], end: &[u8]) -> Result<()> {
        self.delete_range_cf(DEFAULT_COLUMN_FAMILY, begin, end)
    }

    pub fn delete_range_cf(&mut self, cf: u32, begin: &[u8], end: &[u8]) -> Result<()> {
        let offset = self.batch.body().len();
        self.batch.delete_range_cf(cf, begin, end)?;
        self.index.track_range(cf, begin, end, offset);
        Ok(())
    }

    /// Queues log data. It is not indexed.
    pub fn put_log_data(&mut self, blob: &[u8]) -> Result<()> {
        self.batch.put_log_data(blob)
    }

    pub fn set_save_point(&mut self) {
        self.batch.set_save_point();
    }

    /// Rolls the batch back to its most recent save point and drops index
    /// entries for the removed records.
    ///
    /// # Errors
    /// `NotFound` if no save point is set; batch and index are unchanged.
    pub fn rollback_to_save_point(&mut self) -> Result<SavePoint> {
        let save_point = self.batch.rollback_to_save_point()?;
        if self.index.overwrite_key {
            // Older entries for a key were dropped on overwrite; recover them
            // from the surviving records.
            self.index = BatchIndex::build(self.batch.body(), true)?;
        } else {
            self.index.truncate(save_point.body_len);
        }
        Ok(save_point)
    }

    pub fn pop_save_point(&mut self) -> Result<SavePoint> {
        self.batch.pop_save_point()
    }

    /// Removes every record, index entry and save point.
    pub fn clear(&mut self) {
        self.batch.clear();
        self.index.clear();
    }

    pub fn count(&self) -> u32 {
        self.batch.count()
    }

    pub fn data(&self) -> &[u8] {
        self.batch.data()
    }

    /// Returns the underlying batch.
    pub fn batch(&self) -> &WriteBatch {
        &self.batch
    }

    /// Consumes the indexed batch, returning the underlying batch.
    pub fn into_batch(self) -> WriteBatch {
        self.batch
    }
}
