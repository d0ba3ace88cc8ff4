//! Tracing setup shared by the sink binaries and tests.

pub mod tracing;
