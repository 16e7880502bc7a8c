//! Remote playlist store interface

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::RemoteResult;

/// Identifier the remote store assigns to an uploaded track
pub type TrackId = u64;

/// Identifier of a remote playlist or folder
pub type PlaylistId = u64;

/// What a remote playlist node represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Ordinary, user-editable playlist
    Playlist,
    /// Folder whose `tracks` are child playlist IDs
    Folder,
    /// Playlist generated by the service (e.g. "recently played")
    System(String),
}

/// A remote playlist entry as listed by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub name: String,
    pub kind: NodeKind,
    /// Track IDs for playlists, child playlist IDs for folders
    pub tracks: Vec<u64>,
}

impl RemoteNode {
    pub fn playlist(name: impl Into<String>, tracks: Vec<TrackId>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Playlist,
            tracks,
        }
    }

    #[cfg(test)]
    pub fn folder(name: impl Into<String>, children: Vec<PlaylistId>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            tracks: children,
        }
    }
}

/// Operations the sync engine needs from the remote playlist store
///
/// Every call returns an explicit [`RemoteResult`]; the engine decides per
/// playlist whether a failure is logged and skipped.
#[async_trait]
pub trait PlaylistStore {
    /// All playlist nodes, including folders and system playlists
    async fn list_playlists(&mut self) -> RemoteResult<BTreeMap<PlaylistId, RemoteNode>>;

    /// Current track list of a playlist, or `None` if it does not exist
    async fn get_playlist(&mut self, id: PlaylistId) -> RemoteResult<Option<Vec<TrackId>>>;

    /// Create an empty playlist and return its ID
    async fn create_playlist(&mut self, name: &str) -> RemoteResult<PlaylistId>;

    /// Replace a playlist's track list
    async fn set_tracks(&mut self, id: PlaylistId, tracks: &[TrackId]) -> RemoteResult<()>;

    async fn delete_playlist(&mut self, id: PlaylistId) -> RemoteResult<()>;
}
