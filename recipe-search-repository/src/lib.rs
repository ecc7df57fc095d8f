//! # Recipe Search Repository
//!
//! This crate provides everything needed to talk to the recipe index: the
//! index schema, the query builders, the `SearchBackend` trait with an
//! OpenSearch implementation and an in-memory one, and the
//! `RecipeSearchClient` facade built on top of them.

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod query;
pub mod schema;
pub mod types;

pub use client::RecipeSearchClient;
pub use config::{SearchIndexConfig, DEFAULT_INDEX_NAME};
pub use errors::SearchError;
pub use interfaces::SearchBackend;
pub use memory::InMemoryBackend;
pub use opensearch::OpenSearchBackend;
pub use query::{build_autocomplete_query, build_search_query};
pub use schema::{define_schema, define_schema_with, IndexSchema, SchemaSettings};
pub use types::{BulkItemResult, BulkOperation, ClusterHealth, RawHit, RawSearchResponse, WriteMode};
