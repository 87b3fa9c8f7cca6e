//! Record types and decoded records.

use serde::Serialize;

use crate::error::BatchError;

/// Column family id used when a record carries no explicit one.
pub const DEFAULT_COLUMN_FAMILY: u32 = 0;

/// Tag byte identifying the kind of each record in a batch body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum RecordType {
    Deletion = 0x00,
    Value = 0x01,
    Merge = 0x02,
    LogData = 0x03,
    ColumnFamilyDeletion = 0x04,
    ColumnFamilyValue = 0x05,
    ColumnFamilyMerge = 0x06,
    SingleDeletion = 0x07,
    ColumnFamilySingleDeletion = 0x08,
    BeginPrepareXid = 0x09,
    EndPrepareXid = 0x0A,
    CommitXid = 0x0B,
    RollbackXid = 0x0C,
    Noop = 0x0D,
    ColumnFamilyRangeDeletion = 0x0E,
    RangeDeletion = 0x0F,
    ColumnFamilyBlobIndex = 0x10,
    BlobIndex = 0x11,
    BeginPersistedPrepareXid = 0x12,
    /// Reserved sentinel. Never valid inside a batch body.
    NotUsed = 0x7F,
}

/// Fields that follow a tag, in wire order: cf, then key, then value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub cf: bool,
    pub key: bool,
    pub value: bool,
}

impl RecordLayout {
    const fn new(cf: bool, key: bool, value: bool) -> Self {
        Self { cf, key, value }
    }
}

impl RecordType {
    /// Returns the wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns which fields follow this tag in the body.
    ///
    /// Log data and the end-prepare/commit/rollback markers carry their
    /// payload (blob or transaction id) in the value position.
    pub fn layout(self) -> RecordLayout {
        use RecordType::*;
        match self {
            Deletion | SingleDeletion => RecordLayout::new(false, true, false),
            ColumnFamilyDeletion | ColumnFamilySingleDeletion => {
                RecordLayout::new(true, true, false)
            }
            Value | Merge | RangeDeletion | BlobIndex => RecordLayout::new(false, true, true),
            ColumnFamilyValue
            | ColumnFamilyRangeDeletion
            | ColumnFamilyMerge
            | ColumnFamilyBlobIndex => RecordLayout::new(true, true, true),
            LogData | EndPrepareXid | CommitXid | RollbackXid => {
                RecordLayout::new(false, false, true)
            }
            Noop | BeginPrepareXid | BeginPersistedPrepareXid | NotUsed => {
                RecordLayout::new(false, false, false)
            }
        }
    }

    /// Returns the column-family-scoped counterpart of a data record type.
    ///
    /// Types without a scoped form map to themselves.
    pub fn with_column_family(self) -> Self {
        use RecordType::*;
        match self {
            Deletion => ColumnFamilyDeletion,
            Value => ColumnFamilyValue,
            Merge => ColumnFamilyMerge,
            SingleDeletion => ColumnFamilySingleDeletion,
            RangeDeletion => ColumnFamilyRangeDeletion,
            BlobIndex => ColumnFamilyBlobIndex,
            other => other,
        }
    }

    /// Returns `true` for records that mutate a key.
    pub fn is_data(self) -> bool {
        self.layout().key
    }
}

impl TryFrom<u8> for RecordType {
    type Error = BatchError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        use RecordType::*;
        let record_type = match tag {
            0x00 => Deletion,
            0x01 => Value,
            0x02 => Merge,
            0x03 => LogData,
            0x04 => ColumnFamilyDeletion,
            0x05 => ColumnFamilyValue,
            0x06 => ColumnFamilyMerge,
            0x07 => SingleDeletion,
            0x08 => ColumnFamilySingleDeletion,
            0x09 => BeginPrepareXid,
            0x0A => EndPrepareXid,
            0x0B => CommitXid,
            0x0C => RollbackXid,
            0x0D => Noop,
            0x0E => ColumnFamilyRangeDeletion,
            0x0F => RangeDeletion,
            0x10 => ColumnFamilyBlobIndex,
            0x11 => BlobIndex,
            0x12 => BeginPersistedPrepareXid,
            other => return Err(BatchError::UnsupportedRecordType(other)),
        };
        Ok(record_type)
    }
}

/// One decoded record, borrowing its key and value from the batch body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Column family id; `DEFAULT_COLUMN_FAMILY` when the record has none
    pub cf: u32,
    pub key: Option<&'a [u8]>,
    pub value: Option<&'a [u8]>,
    pub record_type: RecordType,
}

impl<'a> Record<'a> {
    /// Copies the record out of the batch body.
    pub fn to_owned_record(&self) -> OwnedRecord {
        OwnedRecord {
            cf: self.cf,
            key: self.key.map(<[u8]>::to_vec),
            value: self.value.map(<[u8]>::to_vec),
            record_type: self.record_type,
        }
    }
}

/// A record that owns its key and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedRecord {
    pub cf: u32,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub record_type: RecordType,
}
