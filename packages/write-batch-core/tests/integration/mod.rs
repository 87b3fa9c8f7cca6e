//! Integration test suite for the write batch.
//!
//! 1. Encode/decode round trips and the wire format
//! 2. Save points and rollback
//! 3. Indexed lookups
//! 4. Malformed input

pub mod decode_safety_tests;
pub mod helpers;
pub mod save_point_tests;
