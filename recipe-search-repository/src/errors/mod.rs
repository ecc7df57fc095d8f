//! Error types for the recipe search repository.

mod search_error;

pub use search_error::SearchError;
