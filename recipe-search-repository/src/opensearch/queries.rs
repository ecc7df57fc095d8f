//! OpenSearch query rendering.
//!
//! Translates a backend-neutral [`QuerySpec`] into OpenSearch query DSL.

use serde_json::{json, Map, Value};

use recipe_search_shared::{ClauseKind, QueryClause, QuerySpec};

/// Build the body of a search request: the rendered query plus the
/// pagination window.
pub fn build_search_body(query: &QuerySpec, from: usize, size: usize) -> Value {
    json!({
        "from": from,
        "size": size,
        "query": render_query(query)
    })
}

/// Render a query specification as OpenSearch query DSL.
pub fn render_query(query: &QuerySpec) -> Value {
    match query {
        QuerySpec::MatchAll => json!({ "match_all": {} }),
        QuerySpec::Bool { should } => {
            let clauses: Vec<Value> = should.iter().map(render_clause).collect();
            json!({
                "bool": {
                    "should": clauses
                }
            })
        }
        QuerySpec::Match(clause) => render_clause(clause),
    }
}

/// Render one clause as `match` or `match_phrase`, with the boost only when
/// one was set.
fn render_clause(clause: &QueryClause) -> Value {
    let mut params = Map::new();
    params.insert("query".to_string(), json!(clause.query));
    if let Some(boost) = clause.boost {
        params.insert("boost".to_string(), json!(boost));
    }

    let kind = match clause.kind {
        ClauseKind::Match => "match",
        ClauseKind::MatchPhrase => "match_phrase",
    };

    let mut field = Map::new();
    field.insert(clause.field.clone(), Value::Object(params));

    let mut rendered = Map::new();
    rendered.insert(kind.to_string(), Value::Object(field));
    Value::Object(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{build_autocomplete_query, build_search_query};

    #[test]
    fn test_render_match_all() {
        let query = render_query(&build_search_query(""));
        assert_eq!(query, json!({ "match_all": {} }));
    }

    #[test]
    fn test_render_relevance_query() {
        let query = render_query(&build_search_query("pasta carbonara"));

        assert_eq!(
            query,
            json!({
                "bool": {
                    "should": [
                        { "match_phrase": { "title": { "query": "pasta carbonara", "boost": 2.0 } } },
                        { "match": { "title": { "query": "pasta carbonara", "boost": 2.0 } } },
                        { "match": { "description": { "query": "pasta carbonara" } } }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_render_autocomplete_query() {
        let query = render_query(&build_autocomplete_query("choc"));
        assert_eq!(
            query,
            json!({ "match": { "title.autocomplete": { "query": "choc" } } })
        );
    }

    #[test]
    fn test_build_search_body() {
        let body = build_search_body(&QuerySpec::MatchAll, 20, 10);

        assert_eq!(body["from"], 20);
        assert_eq!(body["size"], 10);
        assert!(body["query"]["match_all"].is_object());
    }
}
