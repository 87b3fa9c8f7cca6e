use crate::error::{BatchError, Result};

use super::ContentFlags;

/// Position in a batch that a later rollback can truncate back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePoint {
    /// Body length in bytes (header excluded) when the save point was set
    pub body_len: usize,
    /// Record count when the save point was set
    pub count: u32,
    /// Content flags when the save point was set
    pub content_flags: ContentFlags,
}

/// LIFO stack of save points.
#[derive(Debug, Clone, Default)]
pub struct SavePointStack {
    stack: Vec<SavePoint>,
}

impl SavePointStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Records a new save point on top of the stack.
    pub fn push(&mut self, save_point: SavePoint) {
        self.stack.push(save_point);
    }

    /// Removes and returns the most recent save point.
    ///
    /// # Errors
    /// `NotFound` if no save point is set.
    pub fn pop(&mut self) -> Result<SavePoint> {
        self.stack.pop().ok_or(BatchError::NotFound)
    }

    /// Returns the most recent save point without removing it.
    pub fn peek(&self) -> Option<&SavePoint> {
        self.stack.last()
    }

    /// Discards every save point.
    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
