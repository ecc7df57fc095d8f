//! In-memory implementation of the search backend.
//!
//! Used to exercise ingestion and query building without a running cluster.
//! It applies the analyzers declared in the index schema, validates
//! documents against the mappings and scores `match` / `match_phrase`
//! clauses with their boosts. Scores are simple term counts, not BM25.

mod analysis;
mod backend;

pub use analysis::{Analyzer, Token};
pub use backend::{InMemoryBackend, MAX_RESULT_WINDOW};
