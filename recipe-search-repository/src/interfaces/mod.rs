//! Interface definitions for the search backend.
//!
//! This module defines the abstract `SearchBackend` trait that allows the
//! batcher and the search facade to run against OpenSearch in production and
//! against an in-memory fake in tests.

mod search_backend;

pub use search_backend::SearchBackend;
