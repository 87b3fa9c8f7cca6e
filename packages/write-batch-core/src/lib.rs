//! Write batch mutation log for a key-value storage engine.
//!
//! Provides the varint and slice codecs, the write batch buffer with save
//! points, the record decoder and replay handler, and an indexed batch
//! answering lookups against queued writes.

pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod indexed;
pub mod record;

pub use batch::{BatchIterator, Handler, SavePoint, WriteBatch, HEADER_SIZE};
pub use config::BatchConfig;
pub use error::{BatchError, Result};
pub use indexed::{Lookup, WriteBatchWithIndex};
pub use record::{OwnedRecord, Record, RecordType, DEFAULT_COLUMN_FAMILY};
