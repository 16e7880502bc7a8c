//! Configuration file
//!
//! Stored as JSON in ~/.config/ibsync/config.json. Every key is optional; a
//! missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::sync::{PlaylistLayout, TrackBase, resolve_state_path};
use crate::utils::{expand_home, normalize_path};

const APP_DIR: &str = "ibsync";
const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "playlists.json";
const LEGACY_STATE_FILE: &str = ".ibsync-playlists.json";

pub const DEFAULT_API_URL: &str = "https://api.ibroadcast.com/s/JSON";
pub const DEFAULT_LIBRARY_URL: &str = "https://library.ibroadcast.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    /// Without this section there is nothing to sync
    pub playlist: Option<PlaylistConfig>,
    /// Explicit sync state file location
    pub playlist_state: Option<PathBuf>,
    pub remote: RemoteConfig,
}

/// Local beets library
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Music directory, the default base for playlist entries
    pub directory: Option<PathBuf>,
    /// beets `library.db`, defaults to ~/.config/beets/library.db
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    pub playlist_dir: PathBuf,
    /// `library`, `playlist`, or a directory
    pub relative_to: String,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            playlist_dir: PathBuf::from("."),
            relative_to: "library".to_string(),
        }
    }
}

/// iBroadcast endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub api_url: String,
    pub library_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            library_url: DEFAULT_LIBRARY_URL.to_string(),
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or from the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            debug!("No config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Default config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(app_dir()?.join(CONFIG_FILE))
    }

    pub fn library_dir(&self) -> Option<PathBuf> {
        self.library.directory.as_deref().map(resolve)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.library.database {
            Some(path) => Ok(resolve(path)),
            None => {
                let config_dir = dirs::config_dir()
                    .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
                Ok(config_dir.join("beets").join("library.db"))
            }
        }
    }

    /// Playlist directory and entry base, checked against the file system
    pub fn playlist_layout(&self) -> Result<PlaylistLayout, ConfigError> {
        let playlist = self.playlist.as_ref().ok_or(ConfigError::NoPlaylistDir)?;

        let playlist_dir = resolve(&playlist.playlist_dir);
        if !playlist_dir.is_dir() {
            return Err(ConfigError::MissingPlaylistDir(playlist_dir));
        }

        let relative_to = match playlist.relative_to.as_str() {
            "library" => TrackBase::Directory(self.library_dir().ok_or(ConfigError::NoLibraryDir)?),
            "playlist" => TrackBase::Playlist,
            other => {
                let dir = resolve(Path::new(other));
                if !dir.is_dir() {
                    return Err(ConfigError::MissingRelativeTo(dir));
                }
                TrackBase::Directory(dir)
            }
        };

        Ok(PlaylistLayout::new(playlist_dir, relative_to))
    }

    /// Sync state file, moving a legacy one into place if needed
    pub fn state_path(&self) -> Result<PathBuf> {
        let configured = self.playlist_state.as_deref().map(resolve);
        let default = app_dir()?.join(STATE_FILE);
        let legacy = self.library_dir().map(|dir| dir.join(LEGACY_STATE_FILE));
        resolve_state_path(configured.as_deref(), default, legacy.as_deref())
    }
}

fn app_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join(APP_DIR))
}

/// Expand `~` and normalize a configured path
fn resolve(path: &Path) -> PathBuf {
    normalize_path(expand_home(path))
}
