//! M3U playlist reading and writing
//!
//! Playlists are plain text, one track path per line. Blank lines and lines
//! starting with `#` are ignored when reading, which is also what makes the
//! conflict markers written by the sync engine inert to ordinary players.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::atomic::write_atomic;
use super::path::normalize_path;

/// Lines starting with this are comments
pub const COMMENT_MARKER: char = '#';

/// Parse M3U content into normalized track paths
///
/// Relative entries are resolved against `base_dir`; absolute entries are
/// kept as they are. An empty result is valid.
pub fn parse_m3u(content: &str, base_dir: &Path) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .map(|line| normalize_path(base_dir.join(line)))
        .collect()
}

/// Read and parse an M3U file
#[cfg(test)]
pub fn read_m3u(path: &Path, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read playlist {:?}", path))?;
    Ok(parse_m3u(&content, base_dir))
}

/// Render a single track as an M3U line
///
/// Uses a path relative to `base_dir` when the track lives beneath it and
/// the relative form parses back to the same track, otherwise the absolute
/// path. `None` when neither form survives a re-parse.
pub fn track_line(track: &Path, base_dir: &Path) -> Option<String> {
    let relative = track
        .strip_prefix(base_dir)
        .ok()
        .and_then(Path::to_str)
        .filter(|line| is_plain_line(line));
    let absolute = || {
        track
            .to_str()
            .filter(|line| track.is_absolute() && is_plain_line(line))
    };
    relative.or_else(absolute).map(str::to_string)
}

/// A line that `parse_m3u` reads back unchanged as a track
fn is_plain_line(line: &str) -> bool {
    !line.is_empty()
        && !line.starts_with(COMMENT_MARKER)
        && line.trim() == line
        && !line.contains(['\n', '\r'])
}

/// Generate M3U playlist content for the given tracks
///
/// Fails with the tracks that have no line form; nothing is dropped silently.
pub fn generate_m3u(tracks: &[PathBuf], base_dir: &Path) -> Result<String, Vec<PathBuf>> {
    let mut content = String::new();
    let mut unwritable = Vec::new();
    for track in tracks {
        match track_line(track, base_dir) {
            Some(line) => {
                content.push_str(&line);
                content.push('\n');
            }
            None => unwritable.push(track.clone()),
        }
    }
    if unwritable.is_empty() {
        Ok(content)
    } else {
        Err(unwritable)
    }
}

/// Write an M3U file, replacing any previous content atomically
#[cfg(test)]
pub fn write_m3u(path: &Path, tracks: &[PathBuf], base_dir: &Path) -> Result<()> {
    let content = generate_m3u(tracks, base_dir)
        .map_err(|bad| anyhow::anyhow!("Tracks cannot be written as M3U lines: {:?}", bad))?;
    write_playlist_content(path, &content)
}

/// Write already rendered playlist content
pub fn write_playlist_content(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
        .with_context(|| format!("Failed to write playlist {:?}", path))
}
