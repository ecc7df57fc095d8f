//! # Recipe Search Ingest
//!
//! This crate loads recipe documents into the search index.
//!
//! ## Architecture
//!
//! Ingestion is a single pass over a stream of documents:
//!
//! 1. **Source**: Yields documents, e.g. the JSON files of a directory
//! 2. **Document**: Turns each document into an id and a bulk body
//! 3. **Loader**: Groups documents into bounded batches and writes each one
//!    as a single bulk request, collecting per-item failures into a report

pub mod document;
pub mod errors;
pub mod loader;
pub mod source;

pub use document::{IndexDocument, RawDocument};
pub use errors::{IngestError, SourceError};
pub use loader::{BulkIngester, IngestConfig, IngestionReport, ItemFailure, RetryPolicy};
pub use source::RecipeDirectory;
