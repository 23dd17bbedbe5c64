//! Knowledge Portal CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP API server
//! - `poll`    — Ingest from Telegram until Ctrl-C
//! - `seed`    — Insert a mock conversation for development
//! - `tree`    — Print a channel's layer tree
//! - `replay`  — Show where each message of a channel lands
//! - `export`  — Write a channel's tree snapshot as JSON
//! - `state`   — Inspect or reset ingestion checkpoints
//! - `status`  — Show configuration summary

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use portal_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "portal",
    about = "Knowledge Portal — browse chat conversations as a tree of layers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.portal/config.toml)
    #[arg(short, long, global = true, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Long-poll the Telegram Bot API and ingest messages
    Poll,

    /// Insert the mock "design-chat" conversation
    Seed {
        /// SQLite file to seed instead of the configured store
        #[arg(long)]
        db: Option<String>,
    },

    /// Print the layer tree of a channel
    Tree { source: String, channel: String },

    /// Print each message's placement while rebuilding a channel
    Replay {
        source: String,
        channel: String,

        /// Only show one action kind: append, branch or jump
        #[arg(long)]
        only: Option<String>,
    },

    /// Export a channel's tree snapshot as JSON
    Export {
        source: String,
        channel: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or reset ingestion checkpoints
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Show configuration summary
    Status,
}

#[derive(Subcommand)]
enum StateAction {
    /// Print a checkpoint value
    Get { key: String },
    /// Overwrite a checkpoint value (e.g. `state set offset 0`)
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = AppConfig::load_with(cli.config.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Poll => commands::poll::run(config).await?,
        Commands::Seed { db } => commands::seed::run(config, db).await?,
        Commands::Tree { source, channel } => commands::tree::run(config, &source, &channel).await?,
        Commands::Replay {
            source,
            channel,
            only,
        } => commands::replay::run(config, &source, &channel, only.as_deref()).await?,
        Commands::Export {
            source,
            channel,
            output,
        } => commands::export::run(config, &source, &channel, output).await?,
        Commands::State { action } => match action {
            StateAction::Get { key } => commands::state::get(config, &key).await?,
            StateAction::Set { key, value } => commands::state::set(config, &key, &value).await?,
        },
        Commands::Status => commands::status::run(config).await?,
    }

    Ok(())
}
