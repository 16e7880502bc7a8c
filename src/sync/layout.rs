//! Where playlists live on disk

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::utils::{normalize_path, playlist_file_name, sanitize_filename};

/// Directory that relative playlist entries are resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackBase {
    /// A fixed directory, usually the library root
    Directory(PathBuf),
    /// The directory containing each playlist file
    Playlist,
}

/// Playlist directory and entry resolution settings
#[derive(Debug, Clone)]
pub struct PlaylistLayout {
    pub playlist_dir: PathBuf,
    pub relative_to: TrackBase,
}

impl PlaylistLayout {
    pub fn new(playlist_dir: impl AsRef<Path>, relative_to: TrackBase) -> Self {
        Self {
            playlist_dir: normalize_path(playlist_dir),
            relative_to,
        }
    }

    /// Base directory for the entries of the playlist at `playlist`
    pub fn track_base(&self, playlist: &Path) -> PathBuf {
        match &self.relative_to {
            TrackBase::Directory(dir) => dir.clone(),
            TrackBase::Playlist => playlist
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.playlist_dir.clone()),
        }
    }

    /// All `.m3u` files under the playlist directory, sorted by path
    ///
    /// With `filters`, only files whose stem matches one of them
    /// (case-insensitively) are returned.
    pub fn discover(&self, filters: &[String]) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = WalkDir::new(&self.playlist_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|x| x.to_str())
                    .is_some_and(|x| x.eq_ignore_ascii_case("m3u"))
            })
            .filter(|e| {
                filters.is_empty()
                    || e.path()
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .is_some_and(|stem| matches_filter(stem, filters))
            })
            .map(|e| normalize_path(e.path()))
            .collect();

        found.sort();
        debug!(
            "Discovered {} playlists under {}",
            found.len(),
            self.playlist_dir.display()
        );
        found
    }

    /// Local file for a remote playlist, inside its folder's subdirectory
    pub fn download_path(&self, name: &str, folder: Option<&str>) -> PathBuf {
        let dir = match folder {
            Some(folder) => self.playlist_dir.join(sanitize_filename(folder)),
            None => self.playlist_dir.clone(),
        };
        dir.join(playlist_file_name(name))
    }
}

/// Key of a playlist in the sync state
pub fn state_key(playlist: &Path) -> String {
    normalize_path(playlist).to_string_lossy().into_owned()
}

/// Playlist name used for a new remote playlist
pub fn playlist_name(playlist: &Path) -> String {
    playlist
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Case-insensitive name filter match
pub fn matches_filter(name: &str, filters: &[String]) -> bool {
    let name = name.to_lowercase();
    filters.iter().any(|f| f.to_lowercase() == name)
}
