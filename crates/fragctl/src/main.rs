//! fragctl - command-line front end for the fragments store
//!
//! Subcommands:
//! - `fragctl post --type <TYPE> [FILE]` - Create a fragment
//! - `fragctl list [--expand]` - List the owner's fragments
//! - `fragctl get <ID>[.ext]` - Fetch data, optionally converted
//! - `fragctl info <ID>` - Show metadata and conversion formats
//! - `fragctl put <ID> --type <TYPE> [FILE]` - Replace data
//! - `fragctl delete <ID>` - Remove a fragment

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fragments::StoreConfig;

mod commands;

#[derive(Parser)]
#[command(name = "fragctl")]
#[command(about = "Store, fetch and convert typed fragments")]
#[command(version)]
struct Cli {
    /// Owner the command acts for
    #[arg(long, env = "FRAGMENTS_OWNER")]
    owner: String,

    /// TOML config file with a [store] section (defaults to FRAGMENTS_STORE_* env)
    #[arg(long, env = "FRAGMENTS_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL used when reporting a fragment's location
    #[arg(long, env = "FRAGMENTS_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fragment from a file or stdin
    Post {
        /// Content-Type of the data (e.g., "text/markdown")
        #[arg(short = 't', long = "type")]
        content_type: String,

        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// List fragment ids, or full metadata with --expand
    List {
        #[arg(short, long)]
        expand: bool,
    },

    /// Write a fragment's data to stdout or a file
    Get {
        /// Fragment id, optionally with an extension to convert to (e.g., "abc.html")
        id: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a fragment's metadata and the formats it converts to
    Info {
        id: String,
    },

    /// Replace a fragment's data; the type must match the stored type
    Put {
        id: String,

        /// Content-Type of the new data
        #[arg(short = 't', long = "type")]
        content_type: String,

        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Delete a fragment
    Delete {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries fragment data, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::from_env()?,
    };
    let backend = config.open().context("failed to open fragment store")?;
    let backend = backend.as_ref();
    let owner = cli.owner.as_str();

    match cli.command {
        Commands::Post { content_type, file } => {
            commands::post(backend, owner, &content_type, file.as_deref(), &cli.api_url).await?;
        }
        Commands::List { expand } => {
            commands::list(backend, owner, expand).await?;
        }
        Commands::Get { id, output } => {
            commands::get(backend, owner, &id, output.as_deref()).await?;
        }
        Commands::Info { id } => {
            commands::info(backend, owner, &id).await?;
        }
        Commands::Put {
            id,
            content_type,
            file,
        } => {
            commands::put(backend, owner, &id, &content_type, file.as_deref(), &cli.api_url)
                .await?;
        }
        Commands::Delete { id } => {
            commands::delete(backend, owner, &id).await?;
        }
    }

    Ok(())
}
