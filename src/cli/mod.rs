//! CLI module for ibsync

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

use crate::sync::SyncMode;

#[derive(Parser, Debug)]
#[command(name = "ibsync", about = "Sync local playlists with iBroadcast")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.config/ibsync/config.json)
    #[arg(long, global = true, env = "IBSYNC_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store the iBroadcast access token
    Auth {
        /// Access token
        #[arg(long, env = "IBROADCAST_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Force re-authentication (ignore the stored token)
        #[arg(long)]
        force: bool,

        /// Remove the stored token
        #[arg(long, conflicts_with = "force")]
        forget: bool,
    },

    /// Sync playlists between the playlist directory and iBroadcast
    Sync {
        /// Direction to sync
        #[arg(long, value_enum, default_value_t = SyncMode::Bidirectional)]
        mode: SyncMode,

        /// Propagate playlist deletions to the other side
        #[arg(long)]
        delete: bool,

        /// Show what would change without writing anything
        #[arg(short, long, visible_alias = "dry-run")]
        pretend: bool,

        /// Only sync these playlists (or remote folders)
        #[arg(value_name = "PLAYLIST")]
        playlists: Vec<String>,
    },

    /// Show the recorded sync state
    Status,

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
