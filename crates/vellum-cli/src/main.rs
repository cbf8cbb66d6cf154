//! Vellum command line interface
//!
//! Wires configuration, providers and stores together (explicit dependency
//! injection, no ambient globals) and exposes the serve/ingest/query/reset
//! entry points.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vellum_config::Config;
use vellum_core::{GraphStore, VectorIndex};
use vellum_extract::EntityExtractor;
use vellum_ingest::{IngestionPipeline, TextParser, WindowChunker};
use vellum_lance::LanceVectorStore;
use vellum_llm::{create_completion_provider, create_embedding_provider};
use vellum_neo4j::Neo4jStore;
use vellum_retrieval::{HybridRetriever, QueryEngine};
use vellum_web::AppState;

#[derive(Parser)]
#[command(name = "vellum", version, about = "Hybrid graph + vector document retrieval")]
struct Cli {
    /// Path to a TOML config file (defaults to ./vellum.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Ingest documents into the graph and vector stores
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a question over the ingested corpus
    Query {
        /// The question
        query: String,
        /// Number of vector results to seed retrieval with
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Graph traversal depth
        #[arg(long, default_value_t = 2)]
        max_hops: u32,
    },
    /// Delete every node, edge and indexed vector
    Reset {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
}

struct Services {
    pipeline: Arc<IngestionPipeline>,
    engine: Arc<QueryEngine>,
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorIndex>,
}

async fn build_services(config: &Config) -> Result<Services> {
    let completion =
        create_completion_provider(config).context("Failed to create completion provider")?;
    let embedding =
        create_embedding_provider(config).context("Failed to create embedding provider")?;

    let graph: Arc<dyn GraphStore> = Arc::new(
        Neo4jStore::connect(&config.neo4j)
            .await
            .context("Failed to connect to Neo4j")?,
    );
    let vector: Arc<dyn VectorIndex> = Arc::new(
        LanceVectorStore::open(&config.vector.path, &config.vector.table, embedding)
            .await
            .context("Failed to open vector store")?,
    );

    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::new(TextParser::new()),
        Arc::new(WindowChunker::new()),
        EntityExtractor::new(completion.clone()),
        graph.clone(),
        vector.clone(),
    ));
    let engine = Arc::new(QueryEngine::new(
        HybridRetriever::new(vector.clone(), graph.clone()),
        completion,
    ));

    Ok(Services {
        pipeline,
        engine,
        graph,
        vector,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Command::Serve => {
            let services = build_services(&config).await?;
            let state = AppState {
                ingestion: services.pipeline,
                engine: services.engine,
                graph: services.graph,
                vector: services.vector,
                upload_dir: config.server.upload_dir.clone(),
            };
            vellum_web::start_server(state, &config.server.host, config.server.port).await
        }
        Command::Ingest { paths } => {
            let services = build_services(&config).await?;
            let doc_ids = services.pipeline.ingest_many(&paths).await;
            for doc_id in &doc_ids {
                println!("{doc_id}");
            }
            info!("Ingested {} of {} document(s)", doc_ids.len(), paths.len());
            if doc_ids.len() != paths.len() {
                bail!("{} document(s) failed to ingest", paths.len() - doc_ids.len());
            }
            Ok(())
        }
        Command::Query {
            query,
            top_k,
            max_hops,
        } => {
            let services = build_services(&config).await?;
            let outcome = services.engine.query(&query, top_k, max_hops).await;

            println!("{}", outcome.answer);
            if !outcome.sources.is_empty() {
                println!("\nSources:");
                for source in &outcome.sources {
                    match source.chunk_index {
                        Some(index) => {
                            println!("  - {} (chunk {}, via {})", source.filename, index, source.source_type)
                        }
                        None => println!("  - {} (via {})", source.filename, source.source_type),
                    }
                }
            }
            Ok(())
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("Reset deletes all ingested data; re-run with --yes to confirm");
            }
            let services = build_services(&config).await?;
            services.graph.reset().await.context("Graph reset failed")?;
            services
                .vector
                .reset()
                .await
                .context("Vector reset failed")?;
            println!("All stores cleared");
            Ok(())
        }
    }
}
