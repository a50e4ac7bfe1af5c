use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use graph_rag_core::{
    load_folder_chunks_best_effort, ChunkOutcome, ChunkingConfig, GraphSchema, GraphStore,
    KnowledgeGraph, LanguageModel, LlmConfig, OpenAiChatClient, OracleRestStore, SchemaOutcome,
    SqliteGraphStore, TripleOutcome, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "graph-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Storage backend holding the property graph
    #[arg(long, value_enum, env = "GRAPH_BACKEND", default_value = "sqlite")]
    backend: Backend,

    /// Property graph name; tables are named <graph>_entities and <graph>_relations
    #[arg(long, env = "GRAPH_NAME", default_value = "kg_graph")]
    graph_name: String,

    /// SQLite database file (sqlite backend)
    #[arg(long, env = "GRAPH_SQLITE_PATH", default_value = "knowledge_graph.db")]
    sqlite_path: String,

    /// ORDS base URL (oracle backend)
    #[arg(long, env = "ORDS_URL", default_value = "http://localhost:8080")]
    ords_url: String,

    /// ORDS schema alias (oracle backend)
    #[arg(long, env = "ORDS_SCHEMA", default_value = "kg")]
    ords_schema: String,

    /// Database username (oracle backend)
    #[arg(long, env = "ORDS_USER", default_value = "kg")]
    ords_user: String,

    /// Database password (oracle backend)
    #[arg(long, env = "ORDS_PASSWORD", default_value = "", hide_env_values = true)]
    ords_password: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    /// API key sent as a bearer token
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Chat model name
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// Sampling temperature
    #[arg(long, env = "LLM_TEMPERATURE", default_value = "0.0")]
    llm_temperature: f32,

    /// Print results as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Sqlite,
    Oracle,
}

#[derive(Subcommand)]
enum Command {
    /// Create the entity/relation tables and the property graph.
    Init,
    /// Extract triples from every text file in a folder and load them.
    Ingest {
        /// Folder that contains .txt/.md files recursively.
        #[arg(long)]
        folder: String,
        /// Maximum characters per chunk.
        #[arg(long, default_value = "1500")]
        max_chars: usize,
        /// Characters shared by consecutive windows of an oversized paragraph.
        #[arg(long, default_value = "150")]
        overlap_chars: usize,
        /// Chunks shorter than this are dropped.
        #[arg(long, default_value = "40")]
        min_chars: usize,
    },
    /// Turn a question into a sorted keyword list.
    Keywords {
        #[arg(long)]
        question: String,
    },
    /// Search relations whose names or labels contain the text.
    Search {
        #[arg(long)]
        text: String,
    },
    /// Extract keywords from a question and search the graph with them.
    Ask {
        #[arg(long)]
        question: String,
    },
    /// Count entities and relations.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "graph-rag boot"
    );

    let schema = GraphSchema::named(&cli.graph_name)?;
    let llm = OpenAiChatClient::new(LlmConfig {
        base_url: cli.llm_base_url.clone(),
        api_key: cli.llm_api_key.clone(),
        model: cli.llm_model.clone(),
        temperature: cli.llm_temperature,
    })?;

    match cli.backend {
        Backend::Sqlite => {
            let store = SqliteGraphStore::open(&cli.sqlite_path, schema)?;
            run(&cli, KnowledgeGraph::new(store, llm)).await
        }
        Backend::Oracle => {
            let store = OracleRestStore::new(
                &cli.ords_url,
                &cli.ords_schema,
                &cli.ords_user,
                &cli.ords_password,
                schema,
            )?;
            run(&cli, KnowledgeGraph::new(store, llm)).await
        }
    }
}

async fn run<S, L>(cli: &Cli, graph: KnowledgeGraph<S, L>) -> anyhow::Result<()>
where
    S: GraphStore + Send + Sync,
    L: LanguageModel + Send + Sync,
{
    match &cli.command {
        Command::Init => {
            let status = graph.store().ensure_schema().await?;
            println!("schema: {status:?}");
        }
        Command::Ingest {
            folder,
            max_chars,
            overlap_chars,
            min_chars,
        } => {
            let config = ChunkingConfig {
                max_chars: *max_chars,
                overlap_chars: *overlap_chars,
                min_chars: *min_chars,
            };
            let loaded = load_folder_chunks_best_effort(Path::new(folder), config)?;

            for skipped in &loaded.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
            }
            info!(folder = %folder, chunk_count = loaded.chunks.len(), "extracting triples");

            let report = graph.ingest(&loaded.chunks).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if let SchemaOutcome::Failed(cause) = &report.schema {
                    println!("schema setup failed: {cause}");
                }
                for chunk in &report.chunks {
                    match &chunk.outcome {
                        ChunkOutcome::Skipped(reason) => {
                            println!("[{}] skipped: {reason:?}", chunk.source);
                        }
                        ChunkOutcome::Processed { triples, .. } => {
                            for triple in triples {
                                match triple {
                                    TripleOutcome::Inserted { triple, .. } => {
                                        println!("[{}] inserted {triple}", chunk.source);
                                    }
                                    TripleOutcome::Failed { triple, cause } => {
                                        println!("[{}] failed {triple}: {cause}", chunk.source);
                                    }
                                }
                            }
                        }
                    }
                }
                println!(
                    "{} triples inserted, {} failed, {} chunks skipped at {}",
                    report.inserted_count(),
                    report.failed_count(),
                    report.skipped_chunks(),
                    Utc::now().to_rfc3339()
                );
            }
        }
        Command::Keywords { question } => {
            println!("{}", graph.keywords(question).await);
        }
        Command::Search { text } => {
            let outcome = graph.search(text).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{outcome}");
            }
        }
        Command::Ask { question } => {
            let answer = graph.ask(question).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("keywords: {}", answer.keywords);
                println!("{}", answer.outcome);
            }
        }
        Command::Stats => {
            let stats = graph.store().stats().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("entities={} relations={}", stats.entities, stats.relations);
            }
        }
    }

    Ok(())
}
