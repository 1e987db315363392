use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use codeindex::Config;

mod cli;

#[derive(Parser)]
#[command(name = "codeindex")]
#[command(version)]
#[command(about = "Index a codebase's symbols and references without copying its source", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory to index (shorthand for 'codeindex index <path>')
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Configuration file (default: <path>/.codeindex.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a directory and write the index document
    Index {
        /// Directory to index
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file (default: output.path from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Repository label for the document metadata
        #[arg(long)]
        repository: Option<String>,

        /// Worker threads
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Largest file to parse, in bytes
        #[arg(long)]
        max_file_size: Option<u64>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Query an index document
    Query {
        /// Query type: usages, qualified, variable, search, callers, callees
        query_type: String,

        /// Symbol name, qualified name or search text
        target: String,

        /// Index document to read
        #[arg(short, long, default_value = "codeindex.json")]
        index: PathBuf,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Restrict a qualified-name query to one file
        #[arg(long)]
        file: Option<String>,

        /// Restrict a search to one definition kind
        #[arg(long)]
        kind: Option<String>,
    },

    /// Show index statistics
    Stats {
        /// Index document to read
        #[arg(short, long, default_value = "codeindex.json")]
        index: PathBuf,

        /// Per-language and per-extension breakdown
        #[arg(short = 'v', long)]
        detailed: bool,
    },

    /// List supported languages
    Languages,
}

fn init_logging(debug: bool, verbose: bool, config: &Config) -> Result<()> {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match config.logging.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle shorthand: codeindex <path>
    let command = match (cli.command, cli.path) {
        (Some(cmd), _) => cmd,
        (None, path) => Commands::Index {
            path: path.unwrap_or_else(|| PathBuf::from(".")),
            output: None,
            repository: None,
            threads: None,
            max_file_size: None,
            no_progress: false,
        },
    };

    let project_dir = match &command {
        Commands::Index { path, .. } => path.clone(),
        _ => PathBuf::from("."),
    };
    let (config, config_path) = Config::locate(cli.config.as_deref(), &project_dir)?;

    init_logging(cli.debug, cli.verbose, &config)?;
    info!("codeindex v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Loaded configuration from {}", path.display());
    }

    match command {
        Commands::Index {
            path,
            output,
            repository,
            threads,
            max_file_size,
            no_progress,
        } => {
            let options = cli::index::IndexOptions {
                output,
                repository,
                threads,
                max_file_size,
                show_progress: !no_progress,
            };
            cli::index::index_project(path, config, options).await?;
        }

        Commands::Query {
            query_type,
            target,
            index,
            format,
            file,
            kind,
        } => {
            let request = cli::query::QueryRequest {
                query_type,
                target,
                file,
                kind,
            };
            cli::query::query_index(request, index, format).await?;
        }

        Commands::Stats { index, detailed } => {
            cli::stats::show_stats(index, detailed).await?;
        }

        Commands::Languages => {
            cli::languages::list_languages(&config);
        }
    }

    Ok(())
}
