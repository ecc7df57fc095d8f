//! # Recipe Search Shared
//!
//! Types shared between the repository, ingest and binary crates: the recipe
//! document itself, the backend-neutral query specification and the search
//! result shape returned to callers.

pub mod query;
pub mod recipe;
pub mod search;

pub use query::{ClauseKind, QueryClause, QuerySpec};
pub use recipe::{Author, Recipe};
pub use search::{SearchHit, SearchResult};
