//! OpenSearch implementation of the search backend.
//!
//! This module provides the production implementation of `SearchBackend`
//! using the OpenSearch Rust client.

mod client;
mod index_config;
mod queries;

pub use client::OpenSearchBackend;
pub use index_config::create_index_body;
pub use queries::{build_search_body, render_query};
