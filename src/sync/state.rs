//! Persisted sync state
//!
//! One entry per playlist relationship, keyed by the local playlist path. The
//! `tracks` field is the common ancestor used as the merge base on the next run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::store::{PlaylistId, TrackId};
use crate::utils::atomic::write_atomic;

/// Last synced view of one playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Remote playlist ID
    pub id: PlaylistId,
    /// Track IDs as last written to both sides
    pub tracks: Vec<TrackId>,
}

/// Mapping from playlist key to its last synced state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncState {
    entries: BTreeMap<String, StateEntry>,
}

impl SyncState {
    /// Load state from disk
    ///
    /// A missing file is a first run. A file that cannot be read or parsed is
    /// logged and treated as a first run too.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No sync state found at {}", path.display());
            return Self::default();
        }

        let parsed = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync state {:?}", path))
            .and_then(|content| {
                serde_json::from_str::<Self>(&content)
                    .with_context(|| format!("Failed to parse sync state {:?}", path))
            });

        match parsed {
            Ok(state) => {
                debug!("Loaded sync state: {} playlists", state.len());
                state
            }
            Err(e) => {
                error!("Ignoring unreadable sync state, starting fresh: {}", e);
                debug!("{:?}", e);
                Self::default()
            }
        }
    }

    /// Save state to disk atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize sync state")?;
        write_atomic(path, content.as_bytes())
            .with_context(|| format!("Failed to write sync state {:?}", path))?;
        debug!("Saved sync state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&StateEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: StateEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<StateEntry> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pick the state file location, migrating a legacy file once
///
/// An explicitly configured path always wins. Otherwise `default` is used,
/// and if it does not exist yet while `legacy` does, the legacy file is moved
/// into place. Later runs find the file at `default` and skip the move.
pub fn resolve_state_path(
    configured: Option<&Path>,
    default: PathBuf,
    legacy: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    if default.exists() {
        return Ok(default);
    }

    if let Some(legacy) = legacy.filter(|p| p.is_file()) {
        if let Some(parent) = default.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        // Rename fails across filesystems
        if std::fs::rename(legacy, &default).is_err() {
            std::fs::copy(legacy, &default).with_context(|| {
                format!("Failed to copy sync state from {:?} to {:?}", legacy, default)
            })?;
            std::fs::remove_file(legacy)
                .with_context(|| format!("Failed to remove legacy sync state {:?}", legacy))?;
        }
        info!(
            "Moved sync state from {} to {}",
            legacy.display(),
            default.display()
        );
    }

    Ok(default)
}
