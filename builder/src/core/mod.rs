//! Deterministic, pure logic shared by the builder pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod delivery;
pub mod fix_policy;
pub mod ids;
pub mod report;
pub mod types;
