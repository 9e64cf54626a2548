//! Inspector CLI library
//!
//! Exposes the HTTP API so it can be served by the `inspector` binary and
//! exercised by integration tests.

pub mod api;
