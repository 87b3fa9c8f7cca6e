use std::iter::FusedIterator;

use crate::codec::{decode_slice, decode_uvarint};
use crate::error::{BatchError, Result};
use crate::record::{Record, RecordType, DEFAULT_COLUMN_FAMILY};

use super::HEADER_SIZE;

/// Forward-only decoder over a batch body.
///
/// Yields one `Record` per step, borrowing keys and values from the body.
/// The first decode failure is yielded once as `Err` and is then kept in
/// `error()`; afterwards the iterator is exhausted. A record that fails to
/// decode cannot be skipped, since its length is unknown.
#[derive(Debug, Clone)]
pub struct BatchIterator<'a> {
    /// Bytes not yet decoded
    remaining: &'a [u8],
    /// Body offset of the next record
    offset: usize,
    /// Terminal decode error, if any
    error: Option<BatchError>,
}

impl<'a> BatchIterator<'a> {
    /// Creates an iterator over a body with the 12-byte header already removed.
    pub fn new(body: &'a [u8]) -> Self {
        Self {
            remaining: body,
            offset: 0,
            error: None,
        }
    }

    /// Creates an iterator over a full serialized batch, header included.
    ///
    /// Input shorter than the header yields no records and no error.
    pub fn over_batch_data(data: &'a [u8]) -> Self {
        match data.get(HEADER_SIZE..) {
            Some(body) => Self::new(body),
            None => Self::new(&[]),
        }
    }

    /// Returns the terminal decode error, `None` while iterating or after a
    /// clean finish.
    pub fn error(&self) -> Option<&BatchError> {
        self.error.as_ref()
    }

    /// Body offset of the record the next call to `next` decodes.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn decode_record(&self) -> Result<(Record<'a>, &'a [u8])> {
        let (&tag, mut input) = self
            .remaining
            .split_first()
            .ok_or(BatchError::ShortBuffer)?;
        let record_type = RecordType::try_from(tag)?;
        let layout = record_type.layout();

        let mut record = Record {
            cf: DEFAULT_COLUMN_FAMILY,
            key: None,
            value: None,
            record_type,
        };
        if layout.cf {
            let (cf, consumed) = decode_uvarint(input)?;
            record.cf = u32::try_from(cf).map_err(|_| BatchError::MalformedVarint)?;
            input = &input[consumed..];
        }
        if layout.key {
            let (key, rest) = decode_slice(input)?;
            record.key = Some(key);
            input = rest;
        }
        if layout.value {
            let (value, rest) = decode_slice(input)?;
            record.value = Some(value);
            input = rest;
        }
        Ok((record, input))
    }
}

impl<'a> Iterator for BatchIterator<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() || self.remaining.is_empty() {
            return None;
        }
        match self.decode_record() {
            Ok((record, rest)) => {
                self.offset += self.remaining.len() - rest.len();
                self.remaining = rest;
                Some(Ok(record))
            }
            Err(err) => {
                tracing::warn!(offset = self.offset, error = %err, "write batch decode failed");
                self.error = Some(err.clone());
                self.remaining = &[];
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for BatchIterator<'_> {}
