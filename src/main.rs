// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use es_ingest::utils::logging::{format_info, format_success, format_warning};
use es_ingest::{
    Config, Document, DocumentInserter, ElasticClient, EmbeddingClient, IndexManager, SearchHit,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "es_ingest")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Elasticsearch ingestion and vector search pipeline", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Elasticsearch and display cluster info
    Info,

    /// Delete the index if present, then create it
    Recreate {
        #[arg(long)]
        without_embedding: bool,
    },

    /// Recreate the index and bulk-load a JSON document array
    Rebuild {
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Insert a JSON document (or array of documents) from a file
    Insert {
        file: PathBuf,
    },

    /// Search the index
    Search {
        /// Query text for a match query on the configured text field
        query: Option<String>,

        /// Raw query body forwarded verbatim to the engine
        #[arg(long, value_name = "JSON", conflicts_with = "query")]
        body: Option<String>,

        /// Run a kNN query against the embedded query text
        #[arg(long, requires = "query")]
        knn: bool,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Retrieve a document by id
    Get {
        id: String,
    },

    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    es_ingest::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Info => {
            cmd_info(&config).await?;
        }
        Commands::Recreate { without_embedding } => {
            cmd_recreate(&config, without_embedding).await?;
        }
        Commands::Rebuild { file } => {
            cmd_rebuild(&config, file).await?;
        }
        Commands::Insert { file } => {
            cmd_insert(&config, file).await?;
        }
        Commands::Search {
            query,
            body,
            knn,
            limit,
        } => {
            cmd_search(&config, query.as_deref(), body.as_deref(), knn, limit).await?;
        }
        Commands::Get { id } => {
            cmd_get(&config, &id).await?;
        }
        Commands::Stats => {
            cmd_stats(&config).await?;
        }
    }

    Ok(())
}

fn connect(config: &Config) -> Result<ElasticClient> {
    ElasticClient::new(config.elastic.clone()).context("Failed to create Elasticsearch client")
}

async fn cmd_info(config: &Config) -> Result<()> {
    let client = connect(config)?;

    let cluster_info = client
        .info()
        .await
        .context("Cannot connect to Elasticsearch")?;

    println!("{}", format_success("Connected to Elasticsearch!"));
    println!("{}", serde_json::to_string_pretty(&cluster_info)?);

    Ok(())
}

async fn cmd_recreate(config: &Config, without_embedding: bool) -> Result<()> {
    let client = connect(config)?;
    client.ping().await.context("Elasticsearch is unreachable")?;

    let index = IndexManager::new(&client, config.index.clone());
    let dims = (config.index.with_embedding && !without_embedding)
        .then_some(config.embedding.dimensions);

    index
        .recreate(dims)
        .await
        .context("Failed to recreate index")?;

    match dims {
        Some(dims) => println!(
            "{}",
            format_success(&format!(
                "Recreated index '{}' with {}-dim vector field '{}'",
                index.index_name(),
                dims,
                config.index.vector_field
            ))
        ),
        None => println!(
            "{}",
            format_success(&format!("Recreated index '{}'", index.index_name()))
        ),
    }

    Ok(())
}

async fn cmd_rebuild(config: &Config, file: Option<PathBuf>) -> Result<()> {
    let start_time = Instant::now();
    let data_file = file.unwrap_or_else(|| config.ingest.data_file.clone());

    let client = connect(config)?;
    client.ping().await.context("Elasticsearch is unreachable")?;

    let index = IndexManager::new(&client, config.index.clone());
    let inserter = DocumentInserter::new(&client, config);

    let stats = inserter
        .rebuild_from_file(&index, &data_file)
        .await
        .context("Rebuild failed")?;

    let elapsed = start_time.elapsed();
    info!("Rebuild complete in {:.2}s", elapsed.as_secs_f64());

    println!(
        "{}",
        format_success(&format!(
            "Rebuilt index '{}': {} documents indexed",
            config.index.name, stats.indexed
        ))
    );
    if stats.errors > 0 {
        println!(
            "{}",
            format_warning(&format!("{} documents failed", stats.errors))
        );
    }

    Ok(())
}

async fn cmd_insert(config: &Config, file: PathBuf) -> Result<()> {
    let client = connect(config)?;
    let inserter = DocumentInserter::new(&client, config);

    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: Value = serde_json::from_str(&raw).context("Invalid JSON input")?;

    match value {
        Value::Array(_) => {
            let documents = Document::array_from_value(value)?;
            let stats = inserter.bulk_insert(documents).await?;
            println!(
                "{}",
                format_success(&format!(
                    "Inserted {} documents ({} errors)",
                    stats.indexed, stats.errors
                ))
            );
        }
        other => {
            let document = Document::from_value(other)?;
            let response = inserter.insert_document(document).await?;
            println!(
                "{}",
                format_success(&format!(
                    "Inserted document with id: {}",
                    response["_id"].as_str().unwrap_or("?")
                ))
            );
        }
    }

    Ok(())
}

async fn cmd_search(
    config: &Config,
    query: Option<&str>,
    body: Option<&str>,
    knn: bool,
    limit: usize,
) -> Result<()> {
    let client = connect(config)?;

    // A raw body is forwarded verbatim and the response printed unmodified.
    if let Some(raw) = body {
        let body: Value = serde_json::from_str(raw).context("Invalid query body")?;
        let response = client.search(&config.index.name, &body).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let query = query.context("Provide a query string or --body")?;

    let search_body = if knn {
        let query_vector = embed_query(config, query).await;
        json!({
            "knn": {
                "field": config.index.vector_field,
                "query_vector": query_vector,
                "k": limit,
                "num_candidates": limit * 10,
            }
        })
    } else {
        json!({
            "query": {
                "match": {
                    config.index.text_field.clone(): {"query": query}
                }
            },
            "size": limit,
        })
    };

    let response = client.search(&config.index.name, &search_body).await?;
    let hits = SearchHit::from_response(&response);

    if hits.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", query);
        return Ok(());
    }

    if let Some(total) = SearchHit::total(&response) {
        println!("\n{}", format_info(&format!("{} total hits", total)));
    }
    println!("Search Results for: \"{}\"\n", query);
    println!("{}", "=".repeat(80));

    for (idx, hit) in hits.iter().enumerate() {
        println!(
            "\n{}. {}",
            idx + 1,
            hit.format_summary(&config.index.text_field, 300)
        );
    }

    println!("{}", "=".repeat(80));
    info!("Search complete");

    Ok(())
}

async fn embed_query(config: &Config, query: &str) -> Vec<f32> {
    let dims = config.embedding.dimensions;

    if config.embedding.api_key.is_some() {
        let embedder = EmbeddingClient::new(config.embedding.clone());
        match embedder.embed(query).await {
            Ok(embedding) if embedding.len() == dims => return embedding,
            Ok(embedding) => {
                warn!(
                    "Query embedding has dimension {}, expected {}. Using fallback.",
                    embedding.len(),
                    dims
                );
            }
            Err(e) => {
                warn!("Query embedding failed: {}. Using fallback.", e);
            }
        }
    } else {
        info!("No embedding API key configured, using fallback embedding");
    }

    EmbeddingClient::generate_fallback_embedding(query, dims)
}

async fn cmd_get(config: &Config, id: &str) -> Result<()> {
    let client = connect(config)?;

    let response = client
        .get_document(&config.index.name, id)
        .await
        .with_context(|| format!("Failed to retrieve document {}", id))?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    let client = connect(config)?;
    client.ping().await.context("Elasticsearch is unreachable")?;

    let count = client.document_count(&config.index.name).await?;
    println!(
        "{}",
        format_info(&format!(
            "Index '{}' holds {} documents",
            config.index.name, count
        ))
    );

    Ok(())
}
