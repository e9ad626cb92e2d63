use anyhow::Context;
use clap::{Parser, Subcommand};
use local_rag_mcp::commands::{index_files, list_documents, query_store, serve_mcp, show_status};
use local_rag_mcp::config::{
    Config, ConfigOverrides, get_config_dir, run_interactive_config, show_config,
};
use local_rag_mcp::rerank::DEFAULT_RERANK_MODEL;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "local-rag")]
#[command(about = "A local document store with semantic search, served over MCP")]
#[command(version)]
struct Cli {
    /// Configuration directory (default: ~/.local-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Directory holding the vector index and metadata
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
    /// Embedding model to use
    #[arg(long, global = true, value_name = "MODEL")]
    embed: Option<String>,
    /// Re-rank results with a cross-encoder model
    #[arg(
        long,
        global = true,
        value_name = "MODEL",
        num_args = 0..=1,
        default_missing_value = DEFAULT_RERANK_MODEL
    )]
    rerank: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio
    Serve,
    /// Parse and ingest files into the store
    Index {
        /// Files or directories to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Descend into subdirectories
        #[arg(long, short)]
        recursive: bool,
    },
    /// Search the store
    Query {
        /// Query text
        text: String,
        /// Number of results
        #[arg(long, default_value_t = 3)]
        top_k: usize,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List indexed documents
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration and index status
    Status,
    /// Configure embedding, reranking and storage settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            index_dir: self.index_dir.clone(),
            embedding_model: self.embed.clone(),
            rerank_model: self.rerank.clone(),
        }
    }

    fn load_config(&self) -> anyhow::Result<Config> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => get_config_dir()?,
        };
        let mut config = Config::load(&config_dir)?;
        config
            .apply_overrides(&self.overrides())
            .context("Invalid command-line option")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // stdout carries the MCP protocol stream
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Config { show } = cli.command {
        let config_dir = match &cli.config_dir {
            Some(dir) => dir.clone(),
            None => get_config_dir()?,
        };
        if show {
            show_config(&cli.load_config()?)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli.load_config()?;
    let succeeded = match cli.command {
        Commands::Serve => {
            serve_mcp(config).await?;
            true
        }
        Commands::Index { paths, recursive } => index_files(&config, &paths, recursive)?,
        Commands::Query { text, top_k, json } => {
            query_store(&config, &text, top_k, json, &mut io::stdout().lock())?;
            true
        }
        Commands::List { json } => list_documents(
            &config.index_dir(),
            json,
            &mut io::stdout().lock(),
            &mut io::stderr().lock(),
        )?,
        Commands::Status => {
            show_status(&config, &mut io::stdout().lock())?;
            true
        }
        Commands::Config { .. } => true,
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
