//! Search results returned to callers.

use serde::{Deserialize, Serialize};

use crate::recipe::Recipe;

/// A single matched document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document id (the recipe's `source_url`).
    pub id: String,
    /// Relevance score. `None` when the backend did not score the hit.
    pub score: Option<f64>,
    pub recipe: Recipe,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Offset of the first hit, as requested.
    pub from: usize,
    /// Page size, as requested.
    pub size: usize,
    /// Total number of matching documents, not just this page.
    pub total: u64,
    /// Hits in ranking order.
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    /// An empty page for the given window.
    pub fn empty(from: usize, size: usize) -> Self {
        Self {
            from,
            size,
            total: 0,
            hits: Vec::new(),
        }
    }

    /// The recipes on this page, in ranking order.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.hits.iter().map(|hit| &hit.recipe)
    }

    /// Whether more results exist after this page.
    pub fn has_more(&self) -> bool {
        ((self.from + self.hits.len()) as u64) < self.total
    }
}
