//! Logging setup for the store and its binary.

pub mod tracing;
