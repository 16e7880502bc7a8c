//! Track identity resolution between local paths and remote track IDs

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

use super::TrackLibrary;
use crate::sync::TrackId;
use crate::utils::normalize_bytes;

/// Library attribute holding the remote track ID
pub const TRACK_ID_ATTR: &str = "ib_trackid";

/// A local track and the remote ID it was last uploaded as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTrack {
    pub path: PathBuf,
    pub remote_id: Option<TrackId>,
}

/// Builds path and ID lookups with one library query each
pub struct TrackResolver<'a> {
    library: &'a dyn TrackLibrary,
    attribute: &'a str,
}

impl<'a> TrackResolver<'a> {
    pub fn new(library: &'a dyn TrackLibrary) -> Self {
        Self {
            library,
            attribute: TRACK_ID_ATTR,
        }
    }

    /// All library tracks carrying the ID attribute
    pub fn tracks(&self) -> Result<Vec<LibraryTrack>> {
        let rows = self.library.paths_with_attribute(self.attribute)?;
        let tracks = rows
            .into_iter()
            .filter_map(|(raw, value)| match normalize_bytes(&raw) {
                Ok(path) => Some(LibraryTrack {
                    path,
                    remote_id: parse_track_id(&value),
                }),
                Err(e) => {
                    debug!("Skipping library path {:?}: {}", String::from_utf8_lossy(&raw), e);
                    None
                }
            })
            .collect();
        Ok(tracks)
    }

    /// Remote IDs for the given paths
    ///
    /// Only paths in `paths` with a recorded, non-zero ID appear in the result.
    pub fn resolve_path_to_id(&self, paths: &HashSet<PathBuf>) -> Result<HashMap<PathBuf, TrackId>> {
        let resolved: HashMap<PathBuf, TrackId> = self
            .tracks()?
            .into_iter()
            .filter(|t| paths.contains(&t.path))
            .filter_map(|t| t.remote_id.map(|id| (t.path, id)))
            .collect();
        debug!("Resolved {} of {} playlist paths", resolved.len(), paths.len());
        Ok(resolved)
    }

    /// Local path for every track with a recorded ID
    ///
    /// When several files share an ID, the first one the library returns wins.
    pub fn resolve_id_to_path(&self) -> Result<HashMap<TrackId, PathBuf>> {
        let mut resolved = HashMap::new();
        for track in self.tracks()? {
            if let Some(id) = track.remote_id {
                resolved.entry(id).or_insert(track.path);
            }
        }
        debug!("Library knows {} remote track IDs", resolved.len());
        Ok(resolved)
    }
}

/// Parse a stored attribute value, treating zero and junk as absent
fn parse_track_id(value: &str) -> Option<TrackId> {
    value.trim().parse::<TrackId>().ok().filter(|id| *id != 0)
}
