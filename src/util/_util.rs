//! Crate-internal utilities

pub mod bytes;
