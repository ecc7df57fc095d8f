//! Query builders for the two recipe query shapes.
//!
//! Both builders produce a backend-neutral [`QuerySpec`]; the OpenSearch
//! backend renders it into query DSL and the in-memory backend evaluates it
//! directly.

use recipe_search_shared::{QueryClause, QuerySpec};

use crate::schema::fields;

/// Boost applied to both title clauses of the relevance query.
pub const TITLE_BOOST: f32 = 2.0;

/// Build the free-text relevance query.
///
/// A blank query matches every recipe. Otherwise a recipe is a hit when any
/// of three clauses matches, and its score is the sum of all matching
/// clauses:
///
/// 1. the whole query as a phrase in `title`, boosted by [`TITLE_BOOST`];
/// 2. any query term in `title`, boosted by [`TITLE_BOOST`];
/// 3. any query term in `description`, unboosted.
///
/// A title that contains the exact phrase therefore collects both title
/// clauses, and a single title term still outweighs a description match.
pub fn build_search_query(query: &str) -> QuerySpec {
    if query.trim().is_empty() {
        return QuerySpec::MatchAll;
    }

    QuerySpec::Bool {
        should: vec![
            QueryClause::phrase(fields::TITLE, query).boosted(TITLE_BOOST),
            QueryClause::matching(fields::TITLE, query).boosted(TITLE_BOOST),
            QueryClause::matching(fields::DESCRIPTION, query),
        ],
    }
}

/// Build the prefix (autocomplete) query against `title.autocomplete`.
///
/// Unlike [`build_search_query`], a blank query is passed through unchanged.
/// The backend analyzes it to no terms, so it matches nothing.
pub fn build_autocomplete_query(query: &str) -> QuerySpec {
    QuerySpec::Match(QueryClause::matching(fields::TITLE_AUTOCOMPLETE, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_search_shared::ClauseKind;

    #[test]
    fn test_blank_search_is_match_all() {
        assert_eq!(build_search_query(""), QuerySpec::MatchAll);
        assert_eq!(build_search_query("   "), QuerySpec::MatchAll);
        assert_eq!(build_search_query("\t\n"), QuerySpec::MatchAll);
    }

    #[test]
    fn test_search_query_clauses() {
        let query = build_search_query("pasta");

        let should = match &query {
            QuerySpec::Bool { should } => should,
            other => panic!("expected bool query, got {:?}", other),
        };
        assert_eq!(should.len(), 3);

        assert_eq!(should[0].kind, ClauseKind::MatchPhrase);
        assert_eq!(should[0].field, "title");
        assert_eq!(should[1].kind, ClauseKind::Match);
        assert_eq!(should[1].field, "title");
        assert_eq!(should[2].kind, ClauseKind::Match);
        assert_eq!(should[2].field, "description");
        assert!(should.iter().all(|clause| clause.query == "pasta"));
    }

    #[test]
    fn test_title_boost_is_twice_description() {
        let query = build_search_query("pasta");
        let clauses = query.clauses();

        let description = clauses[2].effective_boost();
        assert_eq!(clauses[0].effective_boost(), 2.0 * description);
        assert_eq!(clauses[1].effective_boost(), 2.0 * description);
        assert!(clauses[2].boost.is_none());
    }

    #[test]
    fn test_search_query_keeps_original_text() {
        let query = build_search_query("  pasta carbonara ");
        assert_eq!(query.clauses()[0].query, "  pasta carbonara ");
    }

    #[test]
    fn test_autocomplete_query() {
        let query = build_autocomplete_query("choc");
        assert_eq!(
            query,
            QuerySpec::Match(QueryClause::matching("title.autocomplete", "choc"))
        );
    }

    #[test]
    fn test_blank_autocomplete_is_passed_through() {
        let query = build_autocomplete_query("");
        assert!(!query.is_match_all());
        assert_eq!(query.clauses()[0].query, "");
        assert_eq!(query.clauses()[0].field, "title.autocomplete");
    }
}
