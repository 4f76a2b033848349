//! qa - Command-line interface for the hybrid Q&A search service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use qa_core::{
    Embedder, EmbedderBackend, LoadMode, QaConfig, SparseEncoder, Stats, StoreBackend,
    VectorStore,
};
use qa_embed::{Bm25Encoder, MockEmbedder, OnnxEmbedder};
use qa_load::{Loader, LoaderOptions};
use qa_query::{HybridSearcher, SearchSettings};
use qa_server::HttpServer;
use qa_store::{MemoryStore, QdrantStore};

/// qa - Hybrid dense + sparse search over Q&A data
#[derive(Parser)]
#[command(name = "qa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/qa-search/config.toml or ./qa-search.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the questions and answers CSV files into the collection
    Load {
        #[command(flatten)]
        load: LoadArgs,

        /// Drop and recreate the collection first
        #[arg(long)]
        recreate: bool,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run the HTTP search API
    Serve {
        /// Listen address
        #[arg(short, long)]
        bind: Option<String>,

        /// Load the CSV files before serving (useful with the memory backend)
        #[arg(long)]
        load: bool,

        #[command(flatten)]
        load_args: LoadArgs,
    },

    /// Run one search and print the results as JSON
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        limit: Option<u64>,
    },

    /// Show collection statistics
    Stats,

    /// Print the effective configuration
    Config,
}

#[derive(clap::Args)]
struct LoadArgs {
    /// Questions CSV
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Answers CSV
    #[arg(long)]
    answers: Option<PathBuf>,

    /// Record layout
    #[arg(long, value_parser = parse_mode)]
    mode: Option<LoadMode>,

    /// Maximum number of questions to read
    #[arg(long)]
    limit: Option<usize>,
}

impl LoadArgs {
    fn apply(self, config: &mut QaConfig) {
        if let Some(path) = self.questions {
            config.loader.questions_path = path;
        }
        if let Some(path) = self.answers {
            config.loader.answers_path = path;
        }
        if let Some(mode) = self.mode {
            config.loader.mode = mode;
        }
        if self.limit.is_some() {
            config.loader.question_limit = self.limit;
        }
    }
}

fn parse_mode(s: &str) -> Result<LoadMode, String> {
    match s {
        "pairs" => Ok(LoadMode::Pairs),
        "grouped" => Ok(LoadMode::Grouped),
        other => Err(format!("unknown mode {:?} (expected pairs or grouped)", other)),
    }
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> qa_core::Result<QaConfig> {
    // Variables already set in the environment win over `.env`
    match dotenvy::dotenv() {
        Ok(env_file) => debug!("Loaded environment from {:?}", env_file),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }

    let mut config = match path {
        Some(path) => QaConfig::load(path)?,
        None => QaConfig::load_default()?,
    };
    config.apply_env()?;
    Ok(config)
}

/// Store, dense embedder and sparse encoder chosen by the config.
struct Components {
    store: Arc<dyn VectorStore>,
    dense: Arc<dyn Embedder>,
    sparse: Arc<dyn SparseEncoder>,
}

impl Components {
    fn from_config(config: &QaConfig) -> qa_core::Result<Self> {
        let store: Arc<dyn VectorStore> = match config.store.backend {
            StoreBackend::Qdrant => Arc::new(QdrantStore::from_config(&config.store)?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        let dense: Arc<dyn Embedder> = match config.embedding.backend {
            EmbedderBackend::Onnx => Arc::new(OnnxEmbedder::from_config(&config.embedding)?),
            EmbedderBackend::Mock => Arc::new(MockEmbedder::with_config(
                config.embedding.dimension,
                config.embedding.max_tokens,
            )),
        };
        let sparse: Arc<dyn SparseEncoder> = Arc::new(Bm25Encoder::from_config(&config.sparse));

        info!(
            "Using {:?} store, dense model {}, sparse model {}",
            config.store.backend,
            dense.model_name(),
            sparse.model_name()
        );

        Ok(Self {
            store,
            dense,
            sparse,
        })
    }

    fn loader(&self, config: &QaConfig, options: LoaderOptions) -> Loader {
        Loader::new(
            self.store.clone(),
            self.dense.clone(),
            self.sparse.clone(),
            config,
        )
        .with_options(options)
    }

    fn searcher(&self, config: &QaConfig) -> HybridSearcher {
        HybridSearcher::new(
            self.store.clone(),
            self.dense.clone(),
            self.sparse.clone(),
            SearchSettings::from_config(config),
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Config => {
            config.validate()?;
            print!("{}", config.to_toml()?);
        }
        Commands::Load {
            load,
            recreate,
            quiet,
        } => {
            load.apply(&mut config);
            config.validate()?;
            let components = Components::from_config(&config)?;
            let loader = components.loader(&config, LoaderOptions { recreate, quiet });
            let report = loader.run(&config.loader).await?;

            println!(
                "Loaded {} questions and {} answers ({} orphaned) as {} points into '{}'{}",
                report.questions,
                report.answers,
                report.orphan_answers,
                report.points,
                loader.collection(),
                if report.created_collection {
                    " (created)"
                } else {
                    ""
                }
            );
        }
        Commands::Serve {
            bind,
            load,
            load_args,
        } => {
            load_args.apply(&mut config);
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            config.validate()?;
            let components = Components::from_config(&config)?;

            if load {
                components
                    .loader(
                        &config,
                        LoaderOptions {
                            recreate: false,
                            quiet: true,
                        },
                    )
                    .run(&config.loader)
                    .await?;
            }

            let searcher = Arc::new(components.searcher(&config));
            let server = HttpServer::new(config.server.clone(), searcher);

            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl-C");
                    let _ = shutdown_tx.send(());
                }
            });

            server.run(shutdown_rx).await?;
        }
        Commands::Search { query, limit } => {
            config.validate()?;
            let components = Components::from_config(&config)?;
            let hits = components
                .searcher(&config)
                .search_scored(&query, limit)
                .await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Commands::Stats => {
            config.validate()?;
            let components = Components::from_config(&config)?;
            let stats = Stats {
                collection: config.store.collection.clone(),
                points: components
                    .store
                    .count_points(&config.store.collection)
                    .await?,
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_load_args_override_config() {
        let cli = Cli::parse_from([
            "qa",
            "load",
            "--questions",
            "q.csv",
            "--mode",
            "pairs",
            "--limit",
            "5",
            "--recreate",
        ]);
        let Commands::Load { load, recreate, .. } = cli.command else {
            panic!("expected load");
        };
        assert!(recreate);

        let mut config = QaConfig::default();
        load.apply(&mut config);
        assert_eq!(config.loader.questions_path, PathBuf::from("q.csv"));
        assert_eq!(config.loader.answers_path, PathBuf::from("data/Answers.csv"));
        assert_eq!(config.loader.mode, LoadMode::Pairs);
        assert_eq!(config.loader.question_limit, Some(5));
    }

    #[test]
    fn test_bad_mode_rejected() {
        assert!(Cli::try_parse_from(["qa", "load", "--mode", "triples"]).is_err());
    }

    #[test]
    fn test_memory_components() {
        let mut config = QaConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.embedding.backend = EmbedderBackend::Mock;
        config.embedding.dimension = 48;

        let components = Components::from_config(&config).unwrap();
        assert_eq!(components.dense.dimension(), 48);
        assert_eq!(components.sparse.model_name(), "Qdrant/bm25");
    }
}
