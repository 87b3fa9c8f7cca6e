//! Write batch configuration.

use serde::{Deserialize, Serialize};

/// Write batch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Bytes to reserve up front for the buffer, header included
    pub reserved_bytes: usize,
    /// Maximum encoded size of the batch in bytes (0 = unlimited)
    pub max_bytes: usize,
    /// Indexed batches only: keep just the latest entry per key
    pub overwrite_key: bool,
}

impl BatchConfig {
    /// Returns `true` if a batch of `size` bytes fits under `max_bytes`.
    pub fn allows(&self, size: usize) -> bool {
        self.max_bytes == 0 || size <= self.max_bytes
    }
}
