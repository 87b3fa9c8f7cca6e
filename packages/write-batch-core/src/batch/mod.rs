//! Write batch buffer, save points, decoding and replay.
//!
//! A batch is one growable byte buffer:
//!
//! ```text
//! offset 0..8   sequence number (u64 LE), stamped by the apply layer
//! offset 8..12  record count (u32 LE)
//! offset 12..   body: tag(1) [cf varint] [length-prefixed slice]*
//! ```
//!
//! Every append encodes its record completely before touching the buffer,
//! so the body is always a concatenation of whole records.

mod handler;
mod iterator;
mod save_point;

pub use handler::Handler;
pub use iterator::BatchIterator;
pub use save_point::{SavePoint, SavePointStack};

use crate::codec::{encode_slice_parts, encode_uvarint, slice_parts_len, uvarint_len};
use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::record::{RecordType, DEFAULT_COLUMN_FAMILY};

/// Size of the sequence number and count header.
pub const HEADER_SIZE: usize = 12;

const COUNT_OFFSET: usize = 8;

/// Summary of which record kinds a batch holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentFlags(u32);

impl ContentFlags {
    pub const HAS_PUT: u32 = 1 << 0;
    pub const HAS_DELETE: u32 = 1 << 1;
    pub const HAS_SINGLE_DELETE: u32 = 1 << 2;
    pub const HAS_MERGE: u32 = 1 << 3;
    pub const HAS_DELETE_RANGE: u32 = 1 << 4;
    pub const HAS_BLOB_INDEX: u32 = 1 << 5;
    pub const HAS_BEGIN_PREPARE: u32 = 1 << 6;
    pub const HAS_END_PREPARE: u32 = 1 << 7;
    pub const HAS_COMMIT: u32 = 1 << 8;
    pub const HAS_ROLLBACK: u32 = 1 << 9;

    pub fn empty() -> Self {
        Self(0)
    }

    /// Flag bit contributed by a record of the given type.
    pub fn for_record(record_type: RecordType) -> u32 {
        use RecordType::*;
        match record_type {
            Value | ColumnFamilyValue => Self::HAS_PUT,
            Deletion | ColumnFamilyDeletion => Self::HAS_DELETE,
            SingleDeletion | ColumnFamilySingleDeletion => Self::HAS_SINGLE_DELETE,
            Merge | ColumnFamilyMerge => Self::HAS_MERGE,
            RangeDeletion | ColumnFamilyRangeDeletion => Self::HAS_DELETE_RANGE,
            BlobIndex | ColumnFamilyBlobIndex => Self::HAS_BLOB_INDEX,
            BeginPrepareXid | BeginPersistedPrepareXid => Self::HAS_BEGIN_PREPARE,
            EndPrepareXid => Self::HAS_END_PREPARE,
            CommitXid => Self::HAS_COMMIT,
            RollbackXid => Self::HAS_ROLLBACK,
            LogData | Noop | NotUsed => 0,
        }
    }

    pub fn insert(&mut self, bits: u32) {
        self.0 |= bits;
    }

    pub fn contains(&self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Pending mutations encoded into a single buffer for atomic application.
#[derive(Debug, Clone)]
pub struct WriteBatch {
    /// Header followed by the encoded records
    rep: Vec<u8>,
    save_points: SavePointStack,
    content_flags: ContentFlags,
    config: BatchConfig,
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatch {
    /// Creates an empty batch with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BatchConfig::default())
    }

    /// Creates an empty batch with the given configuration.
    pub fn with_config(config: BatchConfig) -> Self {
        let mut rep = Vec::with_capacity(config.reserved_bytes.max(HEADER_SIZE));
        rep.resize(HEADER_SIZE, 0);
        Self {
            rep,
            save_points: SavePointStack::new(),
            content_flags: ContentFlags::empty(),
            config,
        }
    }

    /// Reconstructs a batch from serialized bytes, header included.
    ///
    /// The header is trusted as-is. Body records are not checked here; call
    /// `validate` or iterate to surface malformed input.
    ///
    /// # Errors
    /// `ShortBuffer` if `data` is shorter than the 12-byte header.
    pub fn from_data(data: &[u8]) -> Result<Self> {
        Self::from_data_with_config(data, BatchConfig::default())
    }

    /// Like `from_data`, with an explicit configuration.
    pub fn from_data_with_config(data: &[u8], config: BatchConfig) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(BatchError::ShortBuffer);
        }
        let mut content_flags = ContentFlags::empty();
        for record in BatchIterator::over_batch_data(data) {
            match record {
                Ok(record) => content_flags.insert(ContentFlags::for_record(record.record_type)),
                Err(_) => break,
            }
        }
        Ok(Self {
            rep: data.to_vec(),
            save_points: SavePointStack::new(),
            content_flags,
            config,
        })
    }

    /// Queues a key-value pair.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_cf(DEFAULT_COLUMN_FAMILY, key, value)
    }

    /// Queues a key-value pair in a column family.
    pub fn put_cf(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(RecordType::Value, cf, &[key], &[value])
    }

    /// Queues a key-value pair, each given as fragments to be joined.
    pub fn put_v(&mut self, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        self.put_v_cf(DEFAULT_COLUMN_FAMILY, keys, values)
    }

    /// Queues a fragmented key-value pair in a column family.
    pub fn put_v_cf(&mut self, cf: u32, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        self.append(RecordType::Value, cf, keys, values)
    }

    /// Queues a merge of `value` into the existing value of `key`.
    pub fn merge(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.merge_cf(DEFAULT_COLUMN_FAMILY, key, value)
    }

    /// Queues a merge in a column family.
    pub fn merge_cf(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(RecordType::Merge, cf, &[key], &[value])
    }

    pub fn merge_v(&mut self, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        self.merge_v_cf(DEFAULT_COLUMN_FAMILY, keys, values)
    }

    pub fn merge_v_cf(&mut self, cf: u32, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        self.append(RecordType::Merge, cf, keys, values)
    }

    /// Queues a deletion of `key`.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.delete_cf(DEFAULT_COLUMN_FAMILY, key)
    }

    /// Queues a deletion of `key` in a column family.
    pub fn delete_cf(&mut self, cf: u32, key: &[u8]) -> Result<()> {
        self.append(RecordType::Deletion, cf, &[key], &[])
    }

    pub fn delete_v(&mut self, keys: &[&[u8]]) -> Result<()> {
        self.delete_v_cf(DEFAULT_COLUMN_FAMILY, keys)
    }

    pub fn delete_v_cf(&mut self, cf: u32, keys: &[&[u8]]) -> Result<()> {
        self.append(RecordType::Deletion, cf, keys, &[])
    }

    /// Queues a deletion of a key that was put at most once.
    pub fn single_delete(&mut self, key: &[u8]) -> Result<()> {
        self.single_delete_cf(DEFAULT_COLUMN_FAMILY, key)
    }

    pub fn single_delete_cf(&mut self, cf: u32, key: &[u8]) -> Result<()> {
        self.append(RecordType::SingleDeletion, cf, &[key], &[])
    }

    /// Queues a deletion of every key in `[begin, end)`.
    pub fn delete_range(&mut self, begin: &[u8], end: &[u8]) -> Result<()> {
        self.delete_range_cf(DEFAULT_COLUMN_FAMILY, begin, end)
    }

    /// Queues a range deletion in a column family.
    pub fn delete_range_cf(&mut self, cf: u32, begin: &[u8], end: &[u8]) -> Result<()> {
        self.append(RecordType::RangeDeletion, cf, &[begin], &[end])
    }

    /// Queues a key whose value lives in a blob file, `blob_ref` pointing at it.
    pub fn put_blob_index(&mut self, key: &[u8], blob_ref: &[u8]) -> Result<()> {
        self.put_blob_index_cf(DEFAULT_COLUMN_FAMILY, key, blob_ref)
    }

    pub fn put_blob_index_cf(&mut self, cf: u32, key: &[u8], blob_ref: &[u8]) -> Result<()> {
        self.append(RecordType::BlobIndex, cf, &[key], &[blob_ref])
    }

    /// Queues an opaque blob for log consumers. It mutates no key.
    pub fn put_log_data(&mut self, blob: &[u8]) -> Result<()> {
        self.append(RecordType::LogData, DEFAULT_COLUMN_FAMILY, &[], &[blob])
    }

    pub fn mark_noop(&mut self) -> Result<()> {
        self.append(RecordType::Noop, DEFAULT_COLUMN_FAMILY, &[], &[])
    }

    /// Marks the start of a prepared transaction section.
    pub fn mark_begin_prepare(&mut self) -> Result<()> {
        self.append(RecordType::BeginPrepareXid, DEFAULT_COLUMN_FAMILY, &[], &[])
    }

    pub fn mark_begin_persisted_prepare(&mut self) -> Result<()> {
        self.append(
            RecordType::BeginPersistedPrepareXid,
            DEFAULT_COLUMN_FAMILY,
            &[],
            &[],
        )
    }

    /// Marks the end of the prepared section of transaction `xid`.
    pub fn mark_end_prepare(&mut self, xid: &[u8]) -> Result<()> {
        self.append(RecordType::EndPrepareXid, DEFAULT_COLUMN_FAMILY, &[], &[xid])
    }

    pub fn mark_commit(&mut self, xid: &[u8]) -> Result<()> {
        self.append(RecordType::CommitXid, DEFAULT_COLUMN_FAMILY, &[], &[xid])
    }

    pub fn mark_rollback(&mut self, xid: &[u8]) -> Result<()> {
        self.append(RecordType::RollbackXid, DEFAULT_COLUMN_FAMILY, &[], &[xid])
    }

    /// Encodes one record and appends it.
    ///
    /// Column family 0 uses the compact tag without a cf field. Key and value
    /// fragments are written only where the record layout has those fields.
    /// On error the batch is left exactly as it was.
    fn append(
        &mut self,
        record_type: RecordType,
        cf: u32,
        key: &[&[u8]],
        value: &[&[u8]],
    ) -> Result<()> {
        let record_type = if cf == DEFAULT_COLUMN_FAMILY {
            record_type
        } else {
            record_type.with_column_family()
        };
        let layout = record_type.layout();

        let mut len = 1;
        if layout.cf {
            len += uvarint_len(u64::from(cf));
        }
        if layout.key {
            len += slice_parts_len(key);
        }
        if layout.value {
            len += slice_parts_len(value);
        }

        let requested = self.rep.len() + len;
        if !self.config.allows(requested) {
            tracing::warn!(
                requested,
                limit = self.config.max_bytes,
                "write batch append rejected by size limit"
            );
            return Err(BatchError::MemoryLimit {
                requested,
                limit: self.config.max_bytes,
            });
        }

        let mut record = Vec::with_capacity(len);
        record.push(record_type.tag());
        if layout.cf {
            encode_uvarint(u64::from(cf), &mut record);
        }
        if layout.key {
            encode_slice_parts(key, &mut record);
        }
        if layout.value {
            encode_slice_parts(value, &mut record);
        }
        debug_assert_eq!(record.len(), len);

        self.rep.extend_from_slice(&record);
        self.set_count(self.count() + 1);
        self.content_flags.insert(ContentFlags::for_record(record_type));

        tracing::trace!(
            ?record_type,
            cf,
            record_len = len,
            count = self.count(),
            "write batch append"
        );
        Ok(())
    }

    /// Returns the serialized batch, header included.
    pub fn data(&self) -> &[u8] {
        &self.rep
    }

    /// Consumes the batch, returning its serialized bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.rep
    }

    /// Returns the encoded records without the header.
    pub fn body(&self) -> &[u8] {
        &self.rep[HEADER_SIZE..]
    }

    /// Returns the number of records, as stored in the header.
    pub fn count(&self) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.rep[COUNT_OFFSET..HEADER_SIZE]);
        u32::from_le_bytes(bytes)
    }

    fn set_count(&mut self, count: u32) {
        self.rep[COUNT_OFFSET..HEADER_SIZE].copy_from_slice(&count.to_le_bytes());
    }

    /// Returns the sequence number stored in the header.
    pub fn sequence(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.rep[..COUNT_OFFSET]);
        u64::from_le_bytes(bytes)
    }

    /// Stamps the header's sequence number.
    pub fn set_sequence(&mut self, sequence: u64) {
        self.rep[..COUNT_OFFSET].copy_from_slice(&sequence.to_le_bytes());
    }

    /// Total encoded size in bytes, header included.
    pub fn len(&self) -> usize {
        self.rep.len()
    }

    /// Returns `true` if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.rep.len() == HEADER_SIZE
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn content_flags(&self) -> ContentFlags {
        self.content_flags
    }

    pub fn has_put(&self) -> bool {
        self.content_flags.contains(ContentFlags::HAS_PUT)
    }

    pub fn has_delete(&self) -> bool {
        self.content_flags.contains(ContentFlags::HAS_DELETE)
    }

    pub fn has_single_delete(&self) -> bool {
        self.content_flags.contains(ContentFlags::HAS_SINGLE_DELETE)
    }

    pub fn has_merge(&self) -> bool {
        self.content_flags.contains(ContentFlags::HAS_MERGE)
    }

    pub fn has_delete_range(&self) -> bool {
        self.content_flags.contains(ContentFlags::HAS_DELETE_RANGE)
    }

    pub fn has_commit(&self) -> bool {
        self.content_flags.contains(ContentFlags::HAS_COMMIT)
    }

    /// Removes every record and every save point.
    ///
    /// Rolling back after a clear fails with `NotFound`.
    pub fn clear(&mut self) {
        self.rep.clear();
        self.rep.resize(HEADER_SIZE, 0);
        self.save_points.clear();
        self.content_flags = ContentFlags::empty();
        tracing::debug!("write batch cleared");
    }

    /// Records the current state for a later `rollback_to_save_point`.
    ///
    /// May be called repeatedly; save points nest.
    pub fn set_save_point(&mut self) {
        let save_point = SavePoint {
            body_len: self.rep.len() - HEADER_SIZE,
            count: self.count(),
            content_flags: self.content_flags,
        };
        self.save_points.push(save_point);
        tracing::debug!(
            body_len = save_point.body_len,
            count = save_point.count,
            depth = self.save_points.len(),
            "write batch save point set"
        );
    }

    /// Removes every record appended since the most recent save point, and
    /// that save point.
    ///
    /// # Returns
    /// The save point that was rolled back to.
    ///
    /// # Errors
    /// `NotFound` if no save point is set; the batch is unchanged.
    pub fn rollback_to_save_point(&mut self) -> Result<SavePoint> {
        let save_point = self.save_points.pop().inspect_err(|_| {
            tracing::warn!("write batch rollback requested with no save point");
        })?;
        self.rep.truncate(HEADER_SIZE + save_point.body_len);
        self.set_count(save_point.count);
        self.content_flags = save_point.content_flags;
        tracing::debug!(
            body_len = save_point.body_len,
            count = save_point.count,
            "write batch rolled back to save point"
        );
        Ok(save_point)
    }

    /// Drops the most recent save point without rolling back.
    ///
    /// # Errors
    /// `NotFound` if no save point is set.
    pub fn pop_save_point(&mut self) -> Result<SavePoint> {
        self.save_points.pop()
    }

    /// Number of save points currently set.
    pub fn save_point_depth(&self) -> usize {
        self.save_points.len()
    }

    /// Returns an iterator over the records in the batch.
    pub fn iter(&self) -> BatchIterator<'_> {
        BatchIterator::new(self.body())
    }

    /// Decodes every record and checks the header count against them.
    ///
    /// # Errors
    /// The first decode error, or `CountMismatch`.
    pub fn validate(&self) -> Result<()> {
        let mut actual = 0u32;
        for record in self.iter() {
            record?;
            actual += 1;
        }
        let header = self.count();
        if actual != header {
            return Err(BatchError::CountMismatch { header, actual });
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = Result<crate::record::Record<'a>>;
    type IntoIter = BatchIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
