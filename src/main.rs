//! ibsync - Sync local M3U playlists with iBroadcast

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod error;
mod ibroadcast;
mod library;
mod sync;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ibsync=debug,reqwest=debug"
    } else {
        "ibsync=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let Some(command) = cli.command else {
        <Cli as clap::CommandFactory>::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Auth {
            token,
            force,
            forget,
        } => {
            cli::commands::auth(cli.config, token, force, forget).await?;
        }
        Commands::Sync {
            mode,
            delete,
            pretend,
            playlists,
        } => {
            cli::commands::sync_playlists(cli.config, mode, delete, pretend, playlists).await?;
        }
        Commands::Status => {
            cli::commands::status(cli.config).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
