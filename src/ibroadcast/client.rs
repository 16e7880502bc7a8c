//! iBroadcast HTTP session

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

use super::models::*;
use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::sync::{NodeKind, PlaylistId, PlaylistStore, RemoteNode, TrackId};

const CLIENT_NAME: &str = "ibsync";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Authenticated connection with a snapshot of the remote playlists
///
/// The snapshot is taken once at connect time. Successful mutations are
/// applied to it, so later reads in the same run see them.
pub struct IbroadcastSession {
    api_url: String,
    library_url: String,
    http_client: Client,
    playlists: BTreeMap<PlaylistId, RemoteNode>,
}

impl IbroadcastSession {
    /// Create a session and fetch the library snapshot
    pub async fn connect(remote: &RemoteConfig, token: &str) -> Result<Self> {
        let mut session = Self::new(remote, token)?;
        session
            .refresh()
            .await
            .context("Failed to fetch iBroadcast library")?;
        Ok(session)
    }

    fn new(remote: &RemoteConfig, token: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .context("Access token contains invalid characters")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http_client = Client::builder()
            .user_agent(format!("{}/{}", CLIENT_NAME, CLIENT_VERSION))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url: remote.api_url.trim_end_matches('/').to_string(),
            library_url: remote.library_url.trim_end_matches('/').to_string(),
            http_client,
            playlists: BTreeMap::new(),
        })
    }

    /// Re-download the playlist snapshot
    pub async fn refresh(&mut self) -> RemoteResult<()> {
        debug!("Fetching library from {}", self.library_url);
        let body = json!({
            "mode": "library",
            "client": CLIENT_NAME,
            "version": CLIENT_VERSION,
            "supported_types": false,
        });
        let data: LibraryData = self.post(&self.library_url, &body).await?;
        self.playlists = decode_playlists(&data.library.playlists)?;
        debug!("Found {} remote playlists", self.playlists.len());
        Ok(())
    }

    pub fn playlist_count(&self) -> usize {
        self.playlists
            .values()
            .filter(|n| n.kind == NodeKind::Playlist)
            .count()
    }

    async fn call<T: DeserializeOwned>(&self, body: &Value) -> RemoteResult<T> {
        self.post(&self.api_url, body).await
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, body: &Value) -> RemoteResult<T> {
        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RemoteError::rejected(format!(
                "server returned {}: {}",
                status,
                text.trim()
            )));
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&text)
            .map_err(|e| RemoteError::protocol(format!("unexpected response: {}", e)))?;

        if !parsed.result {
            return Err(RemoteError::rejected(
                parsed
                    .message
                    .unwrap_or_else(|| "operation failed".to_string()),
            ));
        }
        if let Some(message) = &parsed.message {
            debug!("iBroadcast: {}", message);
        }
        Ok(parsed.data)
    }

    #[cfg(test)]
    fn with_snapshot(remote: &RemoteConfig, playlists: BTreeMap<PlaylistId, RemoteNode>) -> Self {
        let mut session = Self::new(remote, "test-token").unwrap();
        session.playlists = playlists;
        session
    }
}

#[async_trait]
impl PlaylistStore for IbroadcastSession {
    async fn list_playlists(&mut self) -> RemoteResult<BTreeMap<PlaylistId, RemoteNode>> {
        Ok(self.playlists.clone())
    }

    async fn get_playlist(&mut self, id: PlaylistId) -> RemoteResult<Option<Vec<TrackId>>> {
        Ok(self
            .playlists
            .get(&id)
            .filter(|n| n.kind == NodeKind::Playlist)
            .map(|n| n.tracks.clone()))
    }

    async fn create_playlist(&mut self, name: &str) -> RemoteResult<PlaylistId> {
        debug!("Creating remote playlist {}", name);
        let body = json!({
            "mode": "createplaylist",
            "name": name,
            "description": "",
            "make_public": false,
            "tracks": [],
        });
        let created: CreatedPlaylist = self.call(&body).await?;
        self.playlists
            .insert(created.playlist_id, RemoteNode::playlist(name, Vec::new()));
        Ok(created.playlist_id)
    }

    async fn set_tracks(&mut self, id: PlaylistId, tracks: &[TrackId]) -> RemoteResult<()> {
        debug!("Setting {} tracks on remote playlist {}", tracks.len(), id);
        let body = json!({
            "mode": "updateplaylist",
            "playlist": id,
            "tracks": tracks,
        });
        let _: Empty = self.call(&body).await?;
        if let Some(node) = self.playlists.get_mut(&id) {
            node.tracks = tracks.to_vec();
        }
        Ok(())
    }

    async fn delete_playlist(&mut self, id: PlaylistId) -> RemoteResult<()> {
        debug!("Deleting remote playlist {}", id);
        let body = json!({
            "mode": "deleteplaylist",
            "playlist": id,
        });
        let _: Empty = self.call(&body).await?;
        self.playlists.remove(&id);
        Ok(())
    }
}
