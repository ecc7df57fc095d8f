//! Backend-neutral query specification.
//!
//! A [`QuerySpec`] describes what to match and how to weight it. Backends
//! translate it into their own request format.

use serde::{Deserialize, Serialize};

/// The query part of a search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySpec {
    /// Every document matches with the same constant score.
    MatchAll,
    /// Documents matching any clause are hits. Scores from all matching
    /// clauses are added together.
    Bool { should: Vec<QueryClause> },
    /// A single scored clause.
    Match(QueryClause),
}

/// How a clause compares its text against a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    /// Any analyzed term of the query matches.
    Match,
    /// All analyzed terms must appear consecutively, in order.
    MatchPhrase,
}

/// One full-text clause against a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryClause {
    pub kind: ClauseKind,
    pub field: String,
    pub query: String,
    /// Multiplier on the clause score. `None` leaves the backend default (1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
}

impl QueryClause {
    /// A term-level match clause.
    pub fn matching(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            kind: ClauseKind::Match,
            field: field.into(),
            query: query.into(),
            boost: None,
        }
    }

    /// An exact phrase clause.
    pub fn phrase(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            kind: ClauseKind::MatchPhrase,
            field: field.into(),
            query: query.into(),
            boost: None,
        }
    }

    /// Set the boost.
    pub fn boosted(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    /// The boost the backend applies, defaulting to 1.0.
    pub fn effective_boost(&self) -> f32 {
        self.boost.unwrap_or(1.0)
    }
}

impl QuerySpec {
    /// Whether this is the unscored match-everything query.
    pub fn is_match_all(&self) -> bool {
        matches!(self, QuerySpec::MatchAll)
    }

    /// All clauses in this query, in order.
    pub fn clauses(&self) -> &[QueryClause] {
        match self {
            QuerySpec::MatchAll => &[],
            QuerySpec::Bool { should } => should,
            QuerySpec::Match(clause) => std::slice::from_ref(clause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_boost_defaults_to_one() {
        let clause = QueryClause::matching("description", "pasta");
        assert_eq!(clause.effective_boost(), 1.0);

        let clause = clause.boosted(2.0);
        assert_eq!(clause.effective_boost(), 2.0);
    }

    #[test]
    fn test_clauses() {
        assert!(QuerySpec::MatchAll.clauses().is_empty());

        let single = QuerySpec::Match(QueryClause::matching("title", "cake"));
        assert_eq!(single.clauses().len(), 1);

        let disjunction = QuerySpec::Bool {
            should: vec![
                QueryClause::phrase("title", "cake"),
                QueryClause::matching("title", "cake"),
            ],
        };
        assert_eq!(disjunction.clauses().len(), 2);
        assert_eq!(disjunction.clauses()[0].kind, ClauseKind::MatchPhrase);
    }
}
