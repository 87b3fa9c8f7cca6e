use crate::error::{BatchError, Result};
use crate::record::RecordType;

use super::WriteBatch;

/// Receives the records of a batch in order during replay.
///
/// Data callbacks default to `NotSupported`, so a handler only accepts the
/// record kinds it implements. Log data and transaction markers default to
/// being ignored.
pub trait Handler {
    fn put_cf(&mut self, _cf: u32, _key: &[u8], _value: &[u8]) -> Result<()> {
        Err(BatchError::NotSupported("put"))
    }

    fn delete_cf(&mut self, _cf: u32, _key: &[u8]) -> Result<()> {
        Err(BatchError::NotSupported("delete"))
    }

    fn single_delete_cf(&mut self, _cf: u32, _key: &[u8]) -> Result<()> {
        Err(BatchError::NotSupported("single delete"))
    }

    fn merge_cf(&mut self, _cf: u32, _key: &[u8], _value: &[u8]) -> Result<()> {
        Err(BatchError::NotSupported("merge"))
    }

    fn delete_range_cf(&mut self, _cf: u32, _begin: &[u8], _end: &[u8]) -> Result<()> {
        Err(BatchError::NotSupported("delete range"))
    }

    fn put_blob_index_cf(&mut self, _cf: u32, _key: &[u8], _blob_ref: &[u8]) -> Result<()> {
        Err(BatchError::NotSupported("blob index"))
    }

    fn log_data(&mut self, _blob: &[u8]) -> Result<()> {
        Ok(())
    }

    fn mark_begin_prepare(&mut self, _persisted: bool) -> Result<()> {
        Ok(())
    }

    fn mark_end_prepare(&mut self, _xid: &[u8]) -> Result<()> {
        Ok(())
    }

    fn mark_commit(&mut self, _xid: &[u8]) -> Result<()> {
        Ok(())
    }

    fn mark_rollback(&mut self, _xid: &[u8]) -> Result<()> {
        Ok(())
    }

    fn mark_noop(&mut self) -> Result<()> {
        Ok(())
    }
}

impl WriteBatch {
    /// Replays every record into `handler`, in buffer order.
    ///
    /// Stops at the first decode or handler error. After a clean pass the
    /// number of records seen must match the header count.
    ///
    /// # Errors
    /// The first decode or handler error, or `CountMismatch`.
    pub fn iterate<H: Handler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        let mut seen = 0u32;
        for record in self.iter() {
            let record = record?;
            let key = record.key.unwrap_or_default();
            let value = record.value.unwrap_or_default();
            let cf = record.cf;

            use RecordType::*;
            match record.record_type {
                Value | ColumnFamilyValue => handler.put_cf(cf, key, value)?,
                Deletion | ColumnFamilyDeletion => handler.delete_cf(cf, key)?,
                SingleDeletion | ColumnFamilySingleDeletion => {
                    handler.single_delete_cf(cf, key)?
                }
                Merge | ColumnFamilyMerge => handler.merge_cf(cf, key, value)?,
                RangeDeletion | ColumnFamilyRangeDeletion => {
                    handler.delete_range_cf(cf, key, value)?
                }
                BlobIndex | ColumnFamilyBlobIndex => handler.put_blob_index_cf(cf, key, value)?,
                LogData => handler.log_data(value)?,
                BeginPrepareXid => handler.mark_begin_prepare(false)?,
                BeginPersistedPrepareXid => handler.mark_begin_prepare(true)?,
                EndPrepareXid => handler.mark_end_prepare(value)?,
                CommitXid => handler.mark_commit(value)?,
                RollbackXid => handler.mark_rollback(value)?,
                Noop => handler.mark_noop()?,
                NotUsed => return Err(BatchError::UnsupportedRecordType(NotUsed.tag())),
            }
            seen += 1;
        }

        let header = self.count();
        if seen != header {
            tracing::warn!(header, actual = seen, "write batch count mismatch on replay");
            return Err(BatchError::CountMismatch {
                header,
                actual: seen,
            });
        }
        Ok(())
    }
}
