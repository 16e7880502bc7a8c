//! In-memory collaborators for engine tests

use anyhow::Result;
use async_trait::async_trait;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::layout::{PlaylistLayout, TrackBase};
use super::store::{NodeKind, PlaylistId, PlaylistStore, RemoteNode, TrackId};
use crate::error::{RemoteError, RemoteResult};
use crate::library::TrackLibrary;
use crate::utils::{read_m3u, write_m3u};

/// A mutation the fake store accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create(String),
    SetTracks(PlaylistId, Vec<TrackId>),
    Delete(PlaylistId),
}

#[derive(Debug, Default)]
pub struct FakeStore {
    pub nodes: BTreeMap<PlaylistId, RemoteNode>,
    pub calls: Vec<StoreCall>,
    /// Playlists whose mutations are rejected
    pub failing: HashSet<PlaylistId>,
    pub fail_create: bool,
    /// Listing and reads fail
    pub offline: bool,
    next_id: PlaylistId,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            next_id: 1000,
            ..Self::default()
        }
    }

    pub fn with_playlist(mut self, id: PlaylistId, name: &str, tracks: Vec<TrackId>) -> Self {
        self.nodes.insert(id, RemoteNode::playlist(name, tracks));
        self
    }

    pub fn with_node(mut self, id: PlaylistId, node: RemoteNode) -> Self {
        self.nodes.insert(id, node);
        self
    }

    pub fn tracks(&self, id: PlaylistId) -> Option<&[TrackId]> {
        self.nodes.get(&id).map(|n| n.tracks.as_slice())
    }

    /// Set a playlist's tracks without recording a call
    pub fn edit(&mut self, id: PlaylistId, tracks: Vec<TrackId>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.tracks = tracks;
        }
    }

    pub fn reset_calls(&mut self) {
        self.calls.clear();
    }

    fn check(&self, id: PlaylistId) -> RemoteResult<()> {
        if self.failing.contains(&id) {
            Err(RemoteError::rejected(format!("playlist {} is locked", id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PlaylistStore for FakeStore {
    async fn list_playlists(&mut self) -> RemoteResult<BTreeMap<PlaylistId, RemoteNode>> {
        if self.offline {
            return Err(RemoteError::transport("connection refused"));
        }
        Ok(self.nodes.clone())
    }

    async fn get_playlist(&mut self, id: PlaylistId) -> RemoteResult<Option<Vec<TrackId>>> {
        if self.offline {
            return Err(RemoteError::transport("connection refused"));
        }
        Ok(self
            .nodes
            .get(&id)
            .filter(|n| n.kind == NodeKind::Playlist)
            .map(|n| n.tracks.clone()))
    }

    async fn create_playlist(&mut self, name: &str) -> RemoteResult<PlaylistId> {
        if self.fail_create {
            return Err(RemoteError::rejected("playlist limit reached"));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, RemoteNode::playlist(name, Vec::new()));
        self.calls.push(StoreCall::Create(name.to_string()));
        Ok(id)
    }

    async fn set_tracks(&mut self, id: PlaylistId, tracks: &[TrackId]) -> RemoteResult<()> {
        self.check(id)?;
        match self.nodes.get_mut(&id) {
            Some(node) => node.tracks = tracks.to_vec(),
            None => return Err(RemoteError::rejected(format!("no playlist {}", id))),
        }
        self.calls.push(StoreCall::SetTracks(id, tracks.to_vec()));
        Ok(())
    }

    async fn delete_playlist(&mut self, id: PlaylistId) -> RemoteResult<()> {
        self.check(id)?;
        self.nodes.remove(&id);
        self.calls.push(StoreCall::Delete(id));
        Ok(())
    }
}

/// A fixed set of library rows that counts how often it is queried
#[derive(Debug, Default)]
pub struct StaticLibrary {
    rows: Vec<(Vec<u8>, String)>,
    queries: Cell<usize>,
}

impl StaticLibrary {
    pub fn new(rows: Vec<(&str, &str)>) -> Self {
        Self::from_raw(
            rows.into_iter()
                .map(|(path, value)| (path.as_bytes().to_vec(), value.to_string()))
                .collect(),
        )
    }

    pub fn from_raw(rows: Vec<(Vec<u8>, String)>) -> Self {
        Self {
            rows,
            queries: Cell::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl TrackLibrary for StaticLibrary {
    fn paths_with_attribute(&self, _attr: &str) -> Result<Vec<(Vec<u8>, String)>> {
        self.queries.set(self.queries.get() + 1);
        Ok(self.rows.clone())
    }
}

/// A music directory with tracks, a playlist directory and a matching library
pub struct Fixture {
    _dir: TempDir,
    pub music: PathBuf,
    pub playlists: PathBuf,
    pub library: StaticLibrary,
    tracks: HashMap<TrackId, PathBuf>,
}

impl Fixture {
    /// Create track files `t<id>.mp3` for each ID, all recorded in the library
    pub fn new(ids: &[TrackId]) -> Self {
        let names: Vec<(TrackId, String)> =
            ids.iter().map(|id| (*id, format!("t{}.mp3", id))).collect();
        Self::with_names(&names)
    }

    /// Create a track file with the given name for each ID
    pub fn with_names(names: &[(TrackId, String)]) -> Self {
        let dir = TempDir::new().unwrap();
        let music = dir.path().join("music");
        let playlists = dir.path().join("playlists");
        std::fs::create_dir_all(&playlists).unwrap();
        std::fs::create_dir_all(&music).unwrap();

        let mut rows = Vec::new();
        let mut tracks = HashMap::new();
        for (id, name) in names {
            let path = music.join(name);
            std::fs::write(&path, b"").unwrap();
            rows.push((path.to_string_lossy().into_owned(), id.to_string()));
            tracks.insert(*id, path);
        }
        let library = StaticLibrary::new(rows.iter().map(|(p, v)| (p.as_str(), v.as_str())).collect());

        Self {
            _dir: dir,
            music,
            playlists,
            library,
            tracks,
        }
    }

    pub fn layout(&self) -> PlaylistLayout {
        PlaylistLayout::new(&self.playlists, TrackBase::Directory(self.music.clone()))
    }

    pub fn track(&self, id: TrackId) -> PathBuf {
        self.tracks[&id].clone()
    }

    pub fn playlist_path(&self, rel: &str) -> PathBuf {
        self.playlists.join(rel)
    }

    /// Write a playlist referencing the given track IDs
    pub fn write_playlist(&self, rel: &str, ids: &[TrackId]) -> PathBuf {
        let path = self.playlist_path(rel);
        let tracks: Vec<PathBuf> = ids.iter().map(|id| self.track(*id)).collect();
        write_m3u(&path, &tracks, &self.music).unwrap();
        path
    }

    /// Write raw playlist content
    pub fn write_raw(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.playlist_path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Track IDs the playlist at `path` currently references
    pub fn read_ids(&self, path: &Path) -> Vec<TrackId> {
        read_m3u(path, &self.music)
            .unwrap()
            .iter()
            .map(|track| {
                self.tracks
                    .iter()
                    .find(|(_, path)| *path == track)
                    .map(|(id, _)| *id)
                    .unwrap()
            })
            .collect()
    }
}
