//! Command handlers.
//!
//! Each handler runs one command against the wired dependencies and writes
//! its human-readable output to `out`. Logs go to stderr separately.

use std::io::Write;
use std::path::Path;

use recipe_search_ingest::{IngestError, IngestionReport, RecipeDirectory};
use recipe_search_repository::ClusterHealth;
use recipe_search_shared::SearchResult;
use tracing::{info, warn};

use crate::config::Dependencies;
use crate::AppError;

/// Print the cluster status. Fails when the cluster is red.
pub async fn health<W: Write>(deps: &Dependencies, out: &mut W) -> Result<ClusterHealth, AppError> {
    let status = deps.client.health_status().await?;
    writeln!(out, "cluster status: {}", status)?;

    if !status.is_available() {
        return Err(AppError::Unhealthy(status));
    }
    Ok(status)
}

pub async fn create_index<W: Write>(deps: &Dependencies, out: &mut W) -> Result<(), AppError> {
    deps.client.create_index().await?;
    writeln!(out, "index created")?;
    Ok(())
}

pub async fn delete_index<W: Write>(deps: &Dependencies, out: &mut W) -> Result<(), AppError> {
    deps.client.delete_index().await?;
    writeln!(out, "index deleted")?;
    Ok(())
}

/// Load every recipe file of `dir` into the index.
///
/// The index is created if missing, or dropped and created again when
/// `recreate` is set. Documents are visible to search once this returns.
pub async fn index_directory<W: Write>(
    deps: &Dependencies,
    dir: &Path,
    recreate: bool,
    out: &mut W,
) -> Result<IngestionReport, AppError> {
    if recreate && deps.client.index_exists().await? {
        info!("Recreating recipe index");
        deps.client.delete_index().await?;
    }
    deps.client.ensure_index().await?;

    let recipes = RecipeDirectory::new(dir)
        .recipes()
        .await
        .map_err(IngestError::from)?;
    let report = deps.ingester.ingest_results(recipes).await?;
    deps.client.refresh().await?;

    writeln!(
        out,
        "processed {} recipes: {} indexed, {} failed in {} batches",
        report.processed,
        report.succeeded,
        report.failed(),
        report.flushes()
    )?;
    for failure in &report.failures {
        writeln!(out, "  failed {}: {}", failure.id, failure.reason)?;
    }
    if !report.is_complete() {
        warn!(failed = report.failed(), "Some recipes were not indexed");
    }

    Ok(report)
}

/// Run a relevance search and print the page.
pub async fn search<W: Write>(
    deps: &Dependencies,
    query: &str,
    from: usize,
    size: usize,
    out: &mut W,
) -> Result<SearchResult, AppError> {
    let result = deps.client.search_text(query, from, size).await?;
    print_results(&result, out)?;
    Ok(result)
}

/// Run a prefix search and print the page.
pub async fn autocomplete<W: Write>(
    deps: &Dependencies,
    query: &str,
    from: usize,
    size: usize,
    out: &mut W,
) -> Result<SearchResult, AppError> {
    let result = deps.client.autocomplete(query, from, size).await?;
    print_results(&result, out)?;
    Ok(result)
}

fn print_results<W: Write>(result: &SearchResult, out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "{} results, showing {}-{}",
        result.total,
        result.from + usize::from(!result.hits.is_empty()),
        result.from + result.hits.len()
    )?;
    for (rank, hit) in result.hits.iter().enumerate() {
        let score = hit
            .score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:>3}. [{}] {}  {}",
            result.from + rank + 1,
            score,
            hit.recipe.title,
            hit.id
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use recipe_search_repository::InMemoryBackend;
    use std::fs;
    use std::sync::Arc;

    fn deps(backend: Arc<InMemoryBackend>, bulk_size: usize) -> Dependencies {
        let config = AppConfig {
            bulk_size,
            ..AppConfig::default()
        };
        Dependencies::with_backend(backend, &config).unwrap()
    }

    fn recipe_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let recipes = [
            ("carbonara.json", "https://example.com/carbonara", "Pasta Carbonara", "Roman classic"),
            ("soup.json", "https://example.com/soup", "Tomato Soup", "Serve with pasta"),
            ("cake.json", "https://example.com/cake", "Chocolate Cake", "Rich and dark"),
        ];
        for (file, url, title, description) in recipes {
            fs::write(
                dir.path().join(file),
                format!(
                    r#"{{"sourceUrl": "{}", "title": "{}", "description": "{}", "servings": 4}}"#,
                    url, title, description
                ),
            )
            .unwrap();
        }
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_index_then_search() {
        let backend = Arc::new(InMemoryBackend::new());
        let deps = deps(backend.clone(), 2);
        let dir = recipe_dir();
        let mut out = Vec::new();

        let report = index_directory(&deps, dir.path(), false, &mut out)
            .await
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.batch_sizes, vec![2, 1]);
        assert!(report.failures[0].id.ends_with("broken.json"));

        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with("processed 4 recipes: 3 indexed, 1 failed in 2 batches"));

        let mut out = Vec::new();
        let result = search(&deps, "pasta carbonara", 0, 10, &mut out).await.unwrap();
        assert_eq!(result.hits[0].recipe.title, "Pasta Carbonara");
        assert_eq!(result.total, 2);

        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with("2 results, showing 1-2"));
        assert!(output.contains("Pasta Carbonara  https://example.com/carbonara"));

        let mut out = Vec::new();
        let result = autocomplete(&deps, "choc", 0, 5, &mut out).await.unwrap();
        assert_eq!(result.total, 1);
    }

    #[tokio::test]
    async fn test_recreate_drops_previous_documents() {
        let backend = Arc::new(InMemoryBackend::new());
        let deps = deps(backend.clone(), 10);
        let dir = recipe_dir();
        let mut out = Vec::new();

        index_directory(&deps, dir.path(), false, &mut out).await.unwrap();
        fs::remove_file(dir.path().join("cake.json")).unwrap();
        index_directory(&deps, dir.path(), true, &mut out).await.unwrap();

        assert_eq!(backend.document_count().await, 2);
    }

    #[tokio::test]
    async fn test_health_and_index_lifecycle() {
        let backend = Arc::new(InMemoryBackend::new());
        let deps = deps(backend.clone(), 10);
        let mut out = Vec::new();

        assert_eq!(health(&deps, &mut out).await.unwrap(), ClusterHealth::Green);
        create_index(&deps, &mut out).await.unwrap();
        assert!(matches!(
            create_index(&deps, &mut out).await,
            Err(AppError::SearchError(_))
        ));
        delete_index(&deps, &mut out).await.unwrap();

        let output = String::from_utf8(out).unwrap();
        assert_eq!(
            output,
            "cluster status: green\nindex created\nindex deleted\n"
        );
    }

    #[tokio::test]
    async fn test_red_cluster_is_unhealthy() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_unassigned_primaries(true);
        let deps = deps(backend, 10);
        let mut out = Vec::new();

        let err = health(&deps, &mut out).await.unwrap_err();

        assert!(matches!(err, AppError::Unhealthy(ClusterHealth::Red)));
        assert_eq!(err.to_string(), "OpenSearch cluster is unhealthy: status red");
        assert_eq!(String::from_utf8(out).unwrap(), "cluster status: red\n");
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_unavailable(true);
        let deps = deps(backend, 10);
        let mut out = Vec::new();

        let result = search(&deps, "soup", 0, 10, &mut out).await;
        match result {
            Err(AppError::SearchError(e)) => assert!(e.is_transport()),
            other => panic!("expected search error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_page_output() {
        let backend = Arc::new(InMemoryBackend::new());
        let deps = deps(backend, 10);
        deps.client.create_index().await.unwrap();
        let mut out = Vec::new();

        search(&deps, "anything", 0, 10, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 results, showing 0-0\n");
    }
}
