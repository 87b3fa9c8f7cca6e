//! Write batch error types.

use thiserror::Error;

/// Write batch operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// A declared length or tag position runs past the end of the input
    #[error("Short buffer: input ends before the encoded value")]
    ShortBuffer,

    /// Varint did not terminate within 10 bytes
    #[error("Malformed varint")]
    MalformedVarint,

    /// Tag byte does not name a record type that may appear in a batch body
    #[error("Unsupported record type 0x{0:02x}")]
    UnsupportedRecordType(u8),

    /// Rollback or pop requested with no save point set
    #[error("Not found: no save point to roll back to")]
    NotFound,

    /// Append would grow the batch past its configured byte limit
    #[error("Memory limit exceeded: batch would grow to {requested} bytes, limit {limit} bytes")]
    MemoryLimit { requested: usize, limit: usize },

    /// Header record count disagrees with the records present in the body
    #[error("Record count mismatch: header says {header}, body holds {actual}")]
    CountMismatch { header: u32, actual: u32 },

    /// Replay handler does not accept this kind of record
    #[error("Not supported: {0}")]
    NotSupported(&'static str),
}

pub type Result<T> = std::result::Result<T, BatchError>;
