//! Sync orchestration between local playlist files and the remote store
//!
//! A run reads the sync state once, walks the upload phase (local playlists
//! against their remote counterparts) and then the download phase (remote
//! playlists against local files), and hands the updated state back to the
//! caller to persist. Per-playlist problems are logged and recorded in the
//! report; only library failures abort the run.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::conflict::{has_conflict_markers, render_conflicted};
use super::layout::{PlaylistLayout, matches_filter, playlist_name, state_key};
use super::merge::merge_track_ids;
use super::report::{Action, SyncReport};
use super::state::{StateEntry, SyncState};
use super::store::{NodeKind, PlaylistId, PlaylistStore, RemoteNode, TrackId};
use crate::error::RemoteError;
use crate::library::{TrackLibrary, TrackResolver};
use crate::utils::{generate_m3u, parse_m3u, write_playlist_content};

/// Which directions a sync run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SyncMode {
    /// Push local changes to the remote only
    Upload,
    /// Pull remote changes into local files only
    Download,
    /// Both directions, merging when both sides changed
    #[default]
    #[value(name = "sync", alias = "bidirectional")]
    Bidirectional,
}

impl SyncMode {
    pub fn uploads(self) -> bool {
        matches!(self, SyncMode::Upload | SyncMode::Bidirectional)
    }

    pub fn downloads(self) -> bool {
        matches!(self, SyncMode::Download | SyncMode::Bidirectional)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Propagate deletions from one side to the other
    pub allow_delete: bool,
    /// Read everything, write nothing
    pub pretend: bool,
    /// Playlist (or remote folder) names to restrict the run to
    pub filters: Vec<String>,
}

/// Lines describing tracks that could not be resolved
type Unresolved = Vec<String>;

/// A local playlist file as read at the start of the run
struct LocalFile {
    entries: Vec<PathBuf>,
    conflicted: bool,
}

/// Current local content of a playlist, in track IDs
enum LocalRead {
    Missing,
    Unreadable(String),
    Conflicted,
    Unresolved(Unresolved),
    Tracks(Vec<TrackId>),
}

/// A playlist with a sync state entry
struct Link {
    key: String,
    path: PathBuf,
    name: String,
    entry: StateEntry,
}

/// Which sides a reconciliation may write to
#[derive(Debug, Clone, Copy)]
struct Writes {
    push: bool,
    pull: bool,
    /// Merge when both sides changed, pushing and writing the result
    merge: bool,
}

/// Drives a single sync run
pub struct SyncEngine<'a, S: PlaylistStore> {
    store: &'a mut S,
    resolver: TrackResolver<'a>,
    layout: PlaylistLayout,
    state: SyncState,
    options: SyncOptions,
    local: BTreeMap<String, Result<LocalFile, String>>,
    path_to_id: HashMap<PathBuf, TrackId>,
    id_to_path: Option<HashMap<TrackId, PathBuf>>,
    /// Remote IDs claimed by more than one state entry
    shared_ids: HashSet<PlaylistId>,
    /// State keys already settled during this run
    reconciled: HashSet<String>,
    report: SyncReport,
}

impl<'a, S: PlaylistStore> SyncEngine<'a, S> {
    pub fn new(
        store: &'a mut S,
        library: &'a dyn TrackLibrary,
        layout: PlaylistLayout,
        state: SyncState,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            resolver: TrackResolver::new(library),
            layout,
            state,
            options,
            local: BTreeMap::new(),
            path_to_id: HashMap::new(),
            id_to_path: None,
            shared_ids: HashSet::new(),
            reconciled: HashSet::new(),
            report: SyncReport::default(),
        }
    }

    /// Run the sync and return the new state with the run report
    ///
    /// In pretend mode the returned state equals the loaded one.
    pub async fn run(mut self) -> Result<(SyncState, SyncReport)> {
        let discovered = self.layout.discover(&self.options.filters);
        self.load_local(&discovered)?;
        self.shared_ids = self.find_shared_ids();

        if self.options.mode.uploads() {
            self.upload_phase(&discovered).await?;
            self.propagate_local_deletions().await;
        }

        if self.options.mode.downloads() {
            match self.store.list_playlists().await {
                Ok(remote) => {
                    self.download_phase(&remote).await?;
                    self.propagate_remote_deletions(&remote);
                }
                Err(e) => {
                    error!("Failed to list remote playlists, skipping downloads: {}", e);
                    debug!("{:?}", e);
                }
            }
        }

        Ok((self.state, self.report))
    }

    /// Read discovered and linked playlist files and resolve their tracks
    fn load_local(&mut self, discovered: &[PathBuf]) -> Result<()> {
        let mut candidates: BTreeSet<PathBuf> = discovered.iter().cloned().collect();
        candidates.extend(
            self.state
                .iter()
                .map(|(key, _)| PathBuf::from(key))
                .filter(|path| path.is_file()),
        );

        let mut wanted = HashSet::new();
        for path in candidates {
            let file = match std::fs::read_to_string(&path) {
                Ok(content) => {
                    let base = self.layout.track_base(&path);
                    Ok(LocalFile {
                        entries: parse_m3u(&content, &base),
                        conflicted: has_conflict_markers(&content),
                    })
                }
                Err(e) => {
                    warn!("Failed to read playlist {}: {}", path.display(), e);
                    Err(e.to_string())
                }
            };
            if let Ok(file) = &file {
                wanted.extend(file.entries.iter().cloned());
            }
            self.local.insert(state_key(&path), file);
        }

        if !wanted.is_empty() {
            self.path_to_id = self
                .resolver
                .resolve_path_to_id(&wanted)
                .context("Failed to look up playlist tracks in the library")?;
        }
        Ok(())
    }

    fn find_shared_ids(&self) -> HashSet<PlaylistId> {
        let mut seen: HashMap<PlaylistId, usize> = HashMap::new();
        for (_, entry) in self.state.iter() {
            *seen.entry(entry.id).or_default() += 1;
        }
        let shared: HashSet<PlaylistId> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id)
            .collect();
        for id in &shared {
            warn!(
                "Remote playlist {} is linked to more than one local playlist, leaving it alone",
                id
            );
        }
        shared
    }

    // ---- upload phase ----

    async fn upload_phase(&mut self, discovered: &[PathBuf]) -> Result<()> {
        for path in discovered {
            let key = state_key(path);
            if !self.reconciled.insert(key.clone()) {
                continue;
            }
            let name = self.display_name(path);
            let linked = self.state.get(&key).cloned();

            let local = match self.local_tracks(&key) {
                LocalRead::Tracks(ids) => ids,
                LocalRead::Missing => continue,
                LocalRead::Unreadable(e) => {
                    self.report.record(&name, Action::Failed, false, Some(e));
                    continue;
                }
                LocalRead::Conflicted => {
                    self.skip(&name, "unresolved conflict markers");
                    continue;
                }
                LocalRead::Unresolved(lines) => {
                    self.skip_unresolved(&name, lines);
                    continue;
                }
            };

            let Some(entry) = linked else {
                self.create_remote(&key, path, &name, local).await;
                continue;
            };

            if self.shared_ids.contains(&entry.id) {
                self.skip(&name, "remote playlist is linked to another local playlist");
                continue;
            }

            if local.is_empty() {
                if self.options.mode.downloads() {
                    debug!("{} is empty, leaving it to the download phase", name);
                    self.reconciled.remove(&key);
                } else {
                    self.skip(&name, "empty playlist");
                }
                continue;
            }

            let remote = match self.store.get_playlist(entry.id).await {
                Ok(Some(tracks)) => tracks,
                Ok(None) => {
                    if self.options.mode.downloads() {
                        self.reconciled.remove(&key);
                    } else {
                        self.skip(&name, "remote playlist no longer exists");
                    }
                    continue;
                }
                Err(e) => {
                    self.remote_failure(&name, "read", &e);
                    continue;
                }
            };

            let link = Link {
                key,
                path: path.clone(),
                name,
                entry,
            };
            let writes = Writes {
                push: true,
                pull: self.options.mode.downloads(),
                merge: self.options.mode.downloads(),
            };
            self.reconcile(link, local, remote, writes).await?;
        }
        Ok(())
    }

    async fn create_remote(&mut self, key: &str, path: &Path, name: &str, tracks: Vec<TrackId>) {
        if tracks.is_empty() {
            self.skip(name, "empty playlist");
            return;
        }

        let detail = Some(format!("{} tracks", tracks.len()));
        if self.options.pretend {
            info!("Would create remote playlist {} ({} tracks)", name, tracks.len());
            self.done(name, Action::Created, detail);
            return;
        }

        let id = match self.store.create_playlist(&playlist_name(path)).await {
            Ok(id) => id,
            Err(e) => {
                self.remote_failure(name, "create", &e);
                return;
            }
        };

        match self.store.set_tracks(id, &tracks).await {
            Ok(()) => {
                info!("Created remote playlist {} ({} tracks)", name, tracks.len());
                self.state.insert(key, StateEntry { id, tracks });
                self.done(name, Action::Created, detail);
            }
            Err(e) => {
                // Link the empty remote playlist so the next run pushes into it
                self.state.insert(
                    key,
                    StateEntry {
                        id,
                        tracks: Vec::new(),
                    },
                );
                self.remote_failure(name, "upload tracks to", &e);
            }
        }
    }

    async fn propagate_local_deletions(&mut self) {
        let gone: Vec<(String, StateEntry)> = self
            .state
            .iter()
            .filter(|(key, _)| !self.reconciled.contains(*key))
            .filter(|(key, _)| self.key_selected(key) && !Path::new(key).exists())
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        for (key, entry) in gone {
            self.reconciled.insert(key.clone());
            let name = self.display_name(Path::new(&key));

            let remote = match self.store.get_playlist(entry.id).await {
                Ok(remote) => remote,
                Err(e) => {
                    self.remote_failure(&name, "read", &e);
                    continue;
                }
            };

            match remote {
                None => self.forget(&key, &name),
                Some(_) if self.shared_ids.contains(&entry.id) => {
                    self.skip(&name, "remote playlist is linked to another local playlist")
                }
                Some(_) if !self.options.allow_delete => self.skip(
                    &name,
                    "local file removed, pass --delete to delete the remote playlist",
                ),
                Some(tracks) if tracks != entry.tracks => {
                    self.skip(&name, "remote changed since the last sync, not deleting")
                }
                Some(_) => self.delete_remote(&key, &name, entry.id).await,
            }
        }
    }

    async fn delete_remote(&mut self, key: &str, name: &str, id: PlaylistId) {
        if self.options.pretend {
            info!("Would delete remote playlist {}", name);
            self.done(name, Action::DeletedRemote, None);
            return;
        }
        match self.store.delete_playlist(id).await {
            Ok(()) => {
                info!("Deleted remote playlist {}", name);
                self.state.remove(key);
                self.done(name, Action::DeletedRemote, None);
            }
            Err(e) => self.remote_failure(name, "delete", &e),
        }
    }

    // ---- download phase ----

    async fn download_phase(&mut self, remote: &BTreeMap<PlaylistId, RemoteNode>) -> Result<()> {
        let folders = folder_names(remote);
        let linked: HashMap<PlaylistId, String> = self
            .state
            .iter()
            .filter(|(_, entry)| !self.shared_ids.contains(&entry.id))
            .map(|(key, entry)| (entry.id, key.clone()))
            .collect();

        for (id, node) in remote {
            if node.kind != NodeKind::Playlist {
                debug!("Ignoring remote {:?} node {}", node.kind, node.name);
                continue;
            }
            let folder = folders.get(id).copied();
            if !self.remote_selected(&node.name, folder) {
                continue;
            }
            if self.shared_ids.contains(id) {
                self.skip(&node.name, "linked to more than one local playlist");
                continue;
            }

            match linked.get(id) {
                Some(key) => self.download_linked(key.clone(), node).await?,
                None => self.download_new(*id, node, folder)?,
            }
        }
        Ok(())
    }

    async fn download_linked(&mut self, key: String, node: &RemoteNode) -> Result<()> {
        if !self.reconciled.insert(key.clone()) {
            return Ok(());
        }
        let path = PathBuf::from(&key);
        let name = self.display_name(&path);

        if !path.exists() {
            // Local deletions are propagated by the upload side
            if !self.options.mode.uploads() {
                self.skip(&name, "local file removed, not re-downloading");
            }
            return Ok(());
        }

        let local = match self.local_tracks(&key) {
            LocalRead::Tracks(ids) => ids,
            LocalRead::Missing => return Ok(()),
            LocalRead::Unreadable(e) => {
                self.report.record(&name, Action::Failed, false, Some(e));
                return Ok(());
            }
            LocalRead::Conflicted => {
                self.skip(&name, "unresolved conflict markers");
                return Ok(());
            }
            LocalRead::Unresolved(lines) => {
                self.skip_unresolved(&name, lines);
                return Ok(());
            }
        };

        let Some(entry) = self.state.get(&key).cloned() else {
            return Ok(());
        };
        let link = Link {
            key,
            path,
            name,
            entry,
        };
        // Local-only changes belong to the upload phase, merges to any run that uploads
        let writes = Writes {
            push: false,
            pull: true,
            merge: self.options.mode.uploads(),
        };
        self.reconcile(link, local, node.tracks.clone(), writes).await
    }

    fn download_new(&mut self, id: PlaylistId, node: &RemoteNode, folder: Option<&str>) -> Result<()> {
        let target = self.layout.download_path(&node.name, folder);
        let key = state_key(&target);
        let name = self.display_name(&target);

        if self.reconciled.contains(&key) || self.state.get(&key).is_some() || target.exists() {
            self.skip(&name, "a local file with this name already exists");
            return Ok(());
        }
        self.reconciled.insert(key.clone());

        if node.tracks.is_empty() {
            debug!("Not downloading empty remote playlist {}", node.name);
            return Ok(());
        }

        let content = match self.playlist_content(&node.tracks, &target)? {
            Ok(content) => content,
            Err(lines) => {
                self.skip_unresolved(&name, lines);
                return Ok(());
            }
        };

        let detail = Some(format!("new, {} tracks", node.tracks.len()));
        if self.options.pretend {
            info!("Would download remote playlist {} to {}", node.name, target.display());
            self.done(&name, Action::Downloaded, detail);
            return Ok(());
        }

        match write_playlist_content(&target, &content) {
            Ok(()) => {
                info!("Downloaded remote playlist {} to {}", node.name, target.display());
                self.state.insert(
                    key,
                    StateEntry {
                        id,
                        tracks: node.tracks.clone(),
                    },
                );
                self.done(&name, Action::Downloaded, detail);
            }
            Err(e) => self.local_failure(&name, &e),
        }
        Ok(())
    }

    fn propagate_remote_deletions(&mut self, remote: &BTreeMap<PlaylistId, RemoteNode>) {
        let gone: Vec<(String, StateEntry)> = self
            .state
            .iter()
            .filter(|(key, _)| !self.reconciled.contains(*key))
            .filter(|(key, entry)| self.key_selected(key) && !remote.contains_key(&entry.id))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        for (key, entry) in gone {
            self.reconciled.insert(key.clone());
            let path = PathBuf::from(&key);
            let name = self.display_name(&path);

            if !path.exists() {
                self.forget(&key, &name);
                continue;
            }
            if !self.options.allow_delete {
                self.skip(
                    &name,
                    "remote playlist removed, pass --delete to delete the local file",
                );
                continue;
            }
            if !self.local_matches(&path, &entry.tracks) {
                self.skip(&name, "local file changed since the last sync, not deleting");
                continue;
            }

            if self.options.pretend {
                info!("Would delete local playlist {}", path.display());
                self.done(&name, Action::DeletedLocal, None);
                continue;
            }
            let removed = std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete playlist {:?}", path));
            match removed {
                Ok(()) => {
                    info!("Deleted local playlist {}", path.display());
                    self.state.remove(&key);
                    self.done(&name, Action::DeletedLocal, None);
                }
                Err(e) => self.local_failure(&name, &e),
            }
        }
    }

    // ---- reconciliation ----

    /// Settle a linked playlist given its current local and remote tracks
    async fn reconcile(
        &mut self,
        link: Link,
        local: Vec<TrackId>,
        remote: Vec<TrackId>,
        writes: Writes,
    ) -> Result<()> {
        let base = &link.entry.tracks;
        let local_changed = &local != base;
        let remote_changed = &remote != base;

        match (local_changed, remote_changed) {
            (false, false) => {
                debug!("{} is up to date", link.name);
                self.report.unchanged += 1;
            }
            (true, false) if writes.push => self.push(link, local).await,
            (true, false) if local.is_empty() => self.skip(&link.name, "empty playlist"),
            (true, false) => self.skip(&link.name, "local changes left for an upload run"),
            (false, true) if writes.pull => self.pull(link, remote)?,
            (false, true) => self.skip(&link.name, "remote changes left for a download run"),
            (true, true) if local == remote => self.converge(link, local),
            (true, true) if writes.merge => self.merge(link, local, remote).await?,
            (true, true) => self.skip(
                &link.name,
                "changed on both sides, run a bidirectional sync to merge",
            ),
        }
        Ok(())
    }

    async fn push(&mut self, link: Link, local: Vec<TrackId>) {
        let detail = Some(format!("{} tracks", local.len()));
        if self.options.pretend {
            info!("Would upload {} ({} tracks)", link.name, local.len());
            self.done(&link.name, Action::Uploaded, detail);
            return;
        }
        match self.store.set_tracks(link.entry.id, &local).await {
            Ok(()) => {
                info!("Uploaded {} ({} tracks)", link.name, local.len());
                self.settle(&link, local);
                self.done(&link.name, Action::Uploaded, detail);
            }
            Err(e) => self.remote_failure(&link.name, "upload", &e),
        }
    }

    fn pull(&mut self, link: Link, remote: Vec<TrackId>) -> Result<()> {
        let content = match self.playlist_content(&remote, &link.path)? {
            Ok(content) => content,
            Err(lines) => {
                self.skip_unresolved(&link.name, lines);
                return Ok(());
            }
        };

        let detail = Some(format!("{} tracks", remote.len()));
        if self.options.pretend {
            info!("Would download {} ({} tracks)", link.name, remote.len());
            self.done(&link.name, Action::Downloaded, detail);
            return Ok(());
        }

        match write_playlist_content(&link.path, &content) {
            Ok(()) => {
                info!("Downloaded {} ({} tracks)", link.name, remote.len());
                self.settle(&link, remote);
                self.done(&link.name, Action::Downloaded, detail);
            }
            Err(e) => self.local_failure(&link.name, &e),
        }
        Ok(())
    }

    fn converge(&mut self, link: Link, tracks: Vec<TrackId>) {
        if self.options.pretend {
            info!("Would record {} as in sync, both sides made the same change", link.name);
        } else {
            info!("{} changed identically on both sides", link.name);
            self.settle(&link, tracks);
        }
        self.done(&link.name, Action::Converged, None);
    }

    async fn merge(&mut self, link: Link, local: Vec<TrackId>, remote: Vec<TrackId>) -> Result<()> {
        let outcome = merge_track_ids(&link.entry.tracks, &local, &remote);

        let Some(merged) = outcome.merged() else {
            let conflicts = outcome.conflict_count();
            let base = self.layout.track_base(&link.path);
            let content = {
                let paths = self.id_to_path()?;
                render_conflicted(&outcome.segments, paths, &base)
            };
            let detail = Some(format!("{} conflicting regions", conflicts));

            if self.options.pretend {
                warn!("Would write {} conflicting regions into {}", conflicts, link.name);
                self.done(&link.name, Action::Conflicted, detail);
                return Ok(());
            }
            match write_playlist_content(&link.path, &content) {
                Ok(()) => {
                    warn!(
                        "Conflict in {}: resolve the {} marked regions and sync again",
                        link.name, conflicts
                    );
                    // The next run sees the resolved file as a local-only change
                    self.settle(&link, remote);
                    self.done(&link.name, Action::Conflicted, detail);
                }
                Err(e) => self.local_failure(&link.name, &e),
            }
            return Ok(());
        };

        let content = match self.playlist_content(&merged, &link.path)? {
            Ok(content) => content,
            Err(lines) => {
                self.skip_unresolved(&link.name, lines);
                return Ok(());
            }
        };

        let detail = Some(format!("{} tracks", merged.len()));
        if self.options.pretend {
            info!("Would merge {} ({} tracks)", link.name, merged.len());
            self.done(&link.name, Action::Merged, detail);
            return Ok(());
        }

        if let Err(e) = self.store.set_tracks(link.entry.id, &merged).await {
            self.remote_failure(&link.name, "upload merge of", &e);
            return Ok(());
        }
        if let Err(e) = write_playlist_content(&link.path, &content) {
            self.local_failure(&link.name, &e.context("merge was uploaded"));
            return Ok(());
        }

        info!("Merged {} ({} tracks)", link.name, merged.len());
        self.settle(&link, merged);
        self.done(&link.name, Action::Merged, detail);
        Ok(())
    }

    // ---- helpers ----

    fn settle(&mut self, link: &Link, tracks: Vec<TrackId>) {
        self.state.insert(
            link.key.clone(),
            StateEntry {
                id: link.entry.id,
                tracks,
            },
        );
    }

    fn forget(&mut self, key: &str, name: &str) {
        if self.options.pretend {
            info!("Would forget {}, it is gone on both sides", name);
        } else {
            info!("Forgetting {}, it is gone on both sides", name);
            self.state.remove(key);
        }
        self.done(name, Action::Forgotten, None);
    }

    fn local_tracks(&self, key: &str) -> LocalRead {
        match self.local.get(key) {
            None => LocalRead::Missing,
            Some(Err(e)) => LocalRead::Unreadable(e.clone()),
            Some(Ok(file)) if file.conflicted => LocalRead::Conflicted,
            Some(Ok(file)) => match self.resolve_entries(&file.entries) {
                Ok(ids) => LocalRead::Tracks(ids),
                Err(lines) => LocalRead::Unresolved(lines),
            },
        }
    }

    fn resolve_entries(&self, entries: &[PathBuf]) -> Result<Vec<TrackId>, Unresolved> {
        let mut ids = Vec::with_capacity(entries.len());
        let mut unresolved = Vec::new();
        for entry in entries {
            match self.path_to_id.get(entry) {
                Some(id) => ids.push(*id),
                None if entry.is_file() => {
                    unresolved.push(format!("[ NOT UPLOADED ] {}", entry.display()))
                }
                None => unresolved.push(format!("[ INVALID FILE ] {}", entry.display())),
            }
        }
        if unresolved.is_empty() {
            Ok(ids)
        } else {
            Err(unresolved)
        }
    }

    /// Whether the file at `path` currently holds exactly `expected`
    fn local_matches(&self, path: &Path, expected: &[TrackId]) -> bool {
        let Ok(content) = std::fs::read_to_string(path) else {
            return false;
        };
        if has_conflict_markers(&content) {
            return false;
        }
        let entries = parse_m3u(&content, &self.layout.track_base(path));
        matches!(self.resolve_entries(&entries), Ok(ids) if ids == expected)
    }

    fn id_to_path(&mut self) -> Result<&HashMap<TrackId, PathBuf>> {
        if self.id_to_path.is_none() {
            let resolved = self
                .resolver
                .resolve_id_to_path()
                .context("Failed to load remote track IDs from the library")?;
            self.id_to_path = Some(resolved);
        }
        Ok(self.id_to_path.get_or_insert_with(HashMap::new))
    }

    fn resolve_ids(&mut self, ids: &[TrackId]) -> Result<Result<Vec<PathBuf>, Unresolved>> {
        let known = self.id_to_path()?;
        let mut paths = Vec::with_capacity(ids.len());
        let mut unresolved = Vec::new();
        for id in ids {
            match known.get(id) {
                Some(path) => paths.push(path.clone()),
                None => unresolved.push(format!("[ NOT IN LIBRARY ] remote track {}", id)),
            }
        }
        if unresolved.is_empty() {
            Ok(Ok(paths))
        } else {
            Ok(Err(unresolved))
        }
    }

    /// Playlist file content for `ids`, written relative to `target`
    ///
    /// Fails with itemized lines if an ID has no local path or a path has no
    /// line form that reads back as the same track.
    fn playlist_content(
        &mut self,
        ids: &[TrackId],
        target: &Path,
    ) -> Result<Result<String, Unresolved>> {
        let paths = match self.resolve_ids(ids)? {
            Ok(paths) => paths,
            Err(lines) => return Ok(Err(lines)),
        };
        let base = self.layout.track_base(target);
        Ok(generate_m3u(&paths, &base).map_err(|bad| {
            bad.iter()
                .map(|path| format!("[ UNWRITABLE PATH ] {:?}", path))
                .collect()
        }))
    }

    fn key_selected(&self, key: &str) -> bool {
        self.options.filters.is_empty()
            || Path::new(key)
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| matches_filter(stem, &self.options.filters))
    }

    fn remote_selected(&self, name: &str, folder: Option<&str>) -> bool {
        let filters = &self.options.filters;
        filters.is_empty()
            || matches_filter(name, filters)
            || folder.is_some_and(|f| matches_filter(f, filters))
    }

    fn display_name(&self, path: &Path) -> String {
        match path.strip_prefix(&self.layout.playlist_dir) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => path.display().to_string(),
        }
    }

    fn done(&mut self, name: &str, action: Action, detail: Option<String>) {
        let pretend = self.options.pretend;
        self.report.record(name, action, pretend, detail);
    }

    fn skip(&mut self, name: &str, reason: &str) {
        warn!("Skipping {}: {}", name, reason);
        self.report
            .record(name, Action::Skipped, false, Some(reason.to_string()));
    }

    fn skip_unresolved(&mut self, name: &str, lines: Unresolved) {
        warn!("Skipping {}: {} unresolved tracks", name, lines.len());
        for line in &lines {
            warn!("  {}", line);
        }
        self.report.record(
            name,
            Action::Skipped,
            false,
            Some(format!("{} unresolved tracks", lines.len())),
        );
    }

    fn remote_failure(&mut self, name: &str, what: &str, err: &RemoteError) {
        error!("Failed to {} remote playlist {}: {}", what, name, err);
        debug!("{:?}", err);
        self.report
            .record(name, Action::Failed, false, Some(format!("{} failed: {}", what, err)));
    }

    fn local_failure(&mut self, name: &str, err: &anyhow::Error) {
        error!("{}: {:#}", name, err);
        debug!("{:?}", err);
        self.report
            .record(name, Action::Failed, false, Some(format!("{:#}", err)));
    }
}

/// Folder name of every playlist that sits in a folder
fn folder_names(remote: &BTreeMap<PlaylistId, RemoteNode>) -> HashMap<PlaylistId, &str> {
    let mut folders = HashMap::new();
    for node in remote.values().filter(|n| n.kind == NodeKind::Folder) {
        for child in &node.tracks {
            folders.entry(*child).or_insert(node.name.as_str());
        }
    }
    folders
}
