//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::AuthManager;
use crate::config::Config;
use crate::ibroadcast::IbroadcastSession;
use crate::library::BeetsLibrary;
use crate::sync::{Action, SyncEngine, SyncMode, SyncOptions, SyncReport, SyncState};

/// Handle the `auth` command
pub async fn auth(
    config_path: Option<PathBuf>,
    token: Option<String>,
    force: bool,
    forget: bool,
) -> Result<()> {
    if forget {
        AuthManager::clear()?;
        println!("{}", "Stored access token removed.".green());
        return Ok(());
    }

    let config = Config::load(config_path.as_deref())?;
    println!("{}", "Configuring iBroadcast access...".cyan());

    let session = AuthManager::authenticate(&config.remote, token, force).await?;

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!("  Remote playlists: {}", session.playlist_count());
    println!();
    println!("Access token stored securely in system keyring.");

    Ok(())
}

/// Handle the `sync` command
pub async fn sync_playlists(
    config_path: Option<PathBuf>,
    mode: SyncMode,
    allow_delete: bool,
    pretend: bool,
    filters: Vec<String>,
) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;

    let layout = match config.playlist_layout() {
        Ok(layout) => layout,
        Err(e) => {
            warn!("Not syncing playlists: {}", e);
            return Ok(());
        }
    };
    let state_path = config.state_path()?;
    let library = BeetsLibrary::open(&config.database_path()?)?;

    let token = AuthManager::load().map_err(|e| {
        e.context(format!(
            "Not authenticated. Run {} first",
            "ibsync auth".cyan()
        ))
    })?;
    let mut session = IbroadcastSession::connect(&config.remote, &token).await?;

    if pretend {
        println!("{}", "[PRETEND] Nothing will be written".yellow());
    }
    println!(
        "Syncing {} with iBroadcast ({} remote playlists)",
        layout.playlist_dir.display().to_string().green(),
        session.playlist_count()
    );

    let state = SyncState::load(&state_path);
    let options = SyncOptions {
        mode,
        allow_delete,
        pretend,
        filters,
    };
    let engine = SyncEngine::new(&mut session, &library, layout, state, options);
    let (state, report) = engine.run().await?;

    if !pretend {
        state
            .save(&state_path)
            .with_context(|| format!("Failed to save sync state to {:?}", state_path))?;
        info!("Saved sync state for {} playlists", state.len());
    }

    print_summary(&report, pretend);
    Ok(())
}

fn print_summary(report: &SyncReport, pretend: bool) {
    println!();
    for outcome in report.outcomes.iter().filter(|o| o.action.is_notable()) {
        let line = outcome.to_string();
        match outcome.action {
            Action::Failed | Action::Conflicted => println!("  {}", line.red()),
            Action::Skipped => println!("  {}", line.yellow()),
            _ => println!("  {}", line),
        }
    }

    let heading = if pretend {
        "Pretend run complete!"
    } else {
        "Sync complete!"
    };
    println!();
    println!("{}", heading.green().bold());
    for action in Action::ALL {
        let count = report.count(action);
        if count > 0 {
            println!("  {}: {}", capitalize(action.label()), count);
        }
    }
    println!("  Unchanged: {}", report.unchanged);
    if !report.has_changes() {
        println!("Everything is up to date.");
    }

    if report.count(Action::Conflicted) > 0 {
        println!();
        println!(
            "{}",
            "Resolve the conflict markers in the files above, then sync again.".yellow()
        );
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Handle the `status` command
pub async fn status(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    let state_path = config.state_path()?;
    let state = SyncState::load(&state_path);

    println!("State file: {}", state_path.display());
    if state.is_empty() {
        println!("{}", "No playlists synced yet.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Synced playlists: {}", state.len()).green().bold()
    );
    for (key, entry) in state.iter() {
        let marker = if Path::new(key).exists() {
            "".normal()
        } else {
            " (missing locally)".yellow()
        };
        println!(
            "  {} -> {} ({} tracks){}",
            key,
            entry.id,
            entry.tracks.len(),
            marker
        );
    }

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "ibsync", &mut io::stdout());
}

impl super::Cli {
    fn command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("deleted remotely"), "Deleted remotely");
        assert_eq!(capitalize(""), "");
    }
}
