//! iBroadcast API wire models
//!
//! Library tables arrive "compressed": a `map` entry names the column of each
//! field, and every other entry is a bare array of values keyed by ID. They
//! are decoded here into [`RemoteNode`]s so nothing past this module sees the
//! wire form.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{RemoteError, RemoteResult};
use crate::sync::{NodeKind, PlaylistId, RemoteNode, TrackId};

/// Envelope shared by all API responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// `false` when the service rejected the request
    #[serde(default = "default_result")]
    pub result: bool,
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

fn default_result() -> bool {
    true
}

/// Response body without fields of interest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Empty {}

// Library response (mode "library")
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryData {
    pub library: LibraryTables,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryTables {
    #[serde(default)]
    pub playlists: Map<String, Value>,
}

// Create playlist response (mode "createplaylist")
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPlaylist {
    pub playlist_id: PlaylistId,
}

/// Expand a compressed table into one field map per entry
pub fn decode_table(table: &Map<String, Value>) -> RemoteResult<BTreeMap<String, Map<String, Value>>> {
    let Some(columns) = table.get("map") else {
        if table.is_empty() {
            return Ok(BTreeMap::new());
        }
        return Err(RemoteError::protocol("library table has no column map"));
    };
    let columns = columns
        .as_object()
        .ok_or_else(|| RemoteError::protocol("library column map is not an object"))?;

    let mut names: BTreeMap<usize, &str> = BTreeMap::new();
    for (name, column) in columns {
        let index = column
            .as_u64()
            .ok_or_else(|| RemoteError::protocol(format!("column {} has no index", name)))?;
        names.insert(index as usize, name.as_str());
    }

    let mut rows = BTreeMap::new();
    for (key, value) in table {
        let Value::Array(values) = value else {
            continue;
        };
        let record: Map<String, Value> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| names.get(&i).map(|name| (name.to_string(), v.clone())))
            .collect();
        rows.insert(key.clone(), record);
    }
    Ok(rows)
}

/// Decode the compressed playlists table
pub fn decode_playlists(table: &Map<String, Value>) -> RemoteResult<BTreeMap<PlaylistId, RemoteNode>> {
    let mut nodes = BTreeMap::new();
    for (key, record) in decode_table(table)? {
        let Ok(id) = key.parse::<PlaylistId>() else {
            debug!("Ignoring playlist entry with key {:?}", key);
            continue;
        };

        let name = record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = match record.get("type") {
            None | Some(Value::Null) => NodeKind::Playlist,
            Some(Value::String(t)) if t == "folder" => NodeKind::Folder,
            Some(Value::String(t)) => NodeKind::System(t.clone()),
            Some(other) => NodeKind::System(other.to_string()),
        };
        let mut tracks: Vec<TrackId> = Vec::new();
        for entry in record.get("tracks").and_then(Value::as_array).into_iter().flatten() {
            match entry.as_u64() {
                Some(track) => tracks.push(track),
                None => debug!("Dropping track entry {} from remote playlist {}", entry, id),
            }
        }

        nodes.insert(id, RemoteNode { name, kind, tracks });
    }
    Ok(nodes)
}
