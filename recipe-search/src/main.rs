use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use recipe_search::config::{AppConfig, ConfigOverrides, Dependencies};
use recipe_search::{commands, logging, AppError};

#[derive(Parser)]
#[command(name = "recipe-search")]
#[command(about = "Create, load and query the recipe search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// OpenSearch URL (overrides OPENSEARCH_URL)
    #[arg(long, global = true)]
    opensearch_url: Option<String>,

    /// Index name (overrides RECIPE_INDEX)
    #[arg(long, global = true)]
    index: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cluster status
    Health,
    /// Create the recipe index
    CreateIndex,
    /// Delete the recipe index and all its documents
    DeleteIndex,
    /// Load every *.json recipe file of a directory
    Index {
        dir: PathBuf,

        /// Documents per bulk request (overrides BULK_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Drop and recreate the index first
        #[arg(long)]
        recreate: bool,
    },
    /// Free-text search over titles and descriptions
    Search {
        query: String,

        #[arg(long, default_value = "0")]
        from: usize,

        #[arg(long, default_value = "10")]
        size: usize,
    },
    /// Prefix search over titles
    Autocomplete {
        query: String,

        #[arg(long, default_value = "0")]
        from: usize,

        #[arg(long, default_value = "10")]
        size: usize,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    logging::init_tracing(config.log_format);

    if let Err(e) = run(cli, config).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);

        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {}", err);
            source = err.source();
        }

        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig, AppError> {
    AppConfig::from_env()?.with_overrides(overrides(cli))
}

fn overrides(cli: &Cli) -> ConfigOverrides {
    let bulk_size = match cli.command {
        Commands::Index { batch_size, .. } => batch_size,
        _ => None,
    };

    ConfigOverrides {
        opensearch_url: cli.opensearch_url.clone(),
        index_name: cli.index.clone(),
        bulk_size,
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), AppError> {
    let deps = Dependencies::new(&config)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Health => {
            commands::health(&deps, &mut out).await?;
        }
        Commands::CreateIndex => commands::create_index(&deps, &mut out).await?,
        Commands::DeleteIndex => commands::delete_index(&deps, &mut out).await?,
        Commands::Index { dir, recreate, .. } => {
            info!(dir = %dir.display(), recreate, "Indexing recipes");
            commands::index_directory(&deps, &dir, recreate, &mut out).await?;
        }
        Commands::Search { query, from, size } => {
            commands::search(&deps, &query, from, size, &mut out).await?;
        }
        Commands::Autocomplete { query, from, size } => {
            commands::autocomplete(&deps, &query, from, size, &mut out).await?;
        }
    }

    Ok(())
}
